//! Backup creation and retention helpers.
//!
//! Backups live next to the target as `<name>.bak.<epoch-secs>` and are
//! verified by reading them back after the write. The mutator never deletes
//! a backup; [`prune_old_backups`] exists for callers with a retention
//! policy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Seconds since the epoch, for backup names
fn epoch_secs() -> u64 {
    use std::time::SystemTime;

    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Pick an unused backup path for the target.
///
/// Rapid successive calls within the same second get a numeric suffix
/// instead of clobbering the previous backup.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let secs = epoch_secs();
    let base = format!("{}.bak.{}", path.display(), secs);

    let mut candidate = PathBuf::from(&base);
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{}", base, counter));
        counter += 1;
    }
    candidate
}

/// Write a verified backup of `contents` next to the target.
///
/// The backup is read back and compared byte-for-byte; a mismatch is an
/// error, since the caller must not mutate anything without a good backup.
pub fn write_backup(path: &Path, contents: &[u8]) -> io::Result<PathBuf> {
    let backup = backup_path_for(path);
    fs::write(&backup, contents)?;

    let written = fs::read(&backup)?;
    if written != contents {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("backup verification failed for {}", backup.display()),
        ));
    }

    debug!("Backup written: {}", backup.display());
    Ok(backup)
}

/// List existing backups for the target, oldest first.
pub fn list_backups(path: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = parent_dir(path);
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{}.bak.", file_name);

    let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();

    backups.sort_by_key(|p| {
        fs::metadata(p)
            .and_then(|m| m.modified())
            .ok()
    });
    Ok(backups)
}

/// Delete all but the newest `keep` backups. Returns the removed paths.
pub fn prune_old_backups(path: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    let backups = list_backups(path)?;
    if backups.len() <= keep {
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    let excess = backups.len() - keep;
    for backup in backups.into_iter().take(excess) {
        fs::remove_file(&backup)?;
        debug!("Pruned backup: {}", backup.display());
        removed.push(backup);
    }
    Ok(removed)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
