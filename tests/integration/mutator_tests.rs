//! End-to-end tests for the safe mutation pipeline.
//!
//! These exercise the library surface the way the CLI does: real files in
//! temp directories, byte-level before/after comparisons.

use confmut::{backup, Matcher, MutationError, Rule, SafeFileMutator};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_target(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn hosts_rules() -> Vec<Rule> {
    vec![
        // Self-matching replacement, so re-running still matches
        Rule::replace(Matcher::Substring("localhost".into()), "127.0.0.2 localhost"),
        Rule::ensure(Matcher::Substring("facebook.com".into()), "8.8.8.8 facebook.com"),
    ]
}

#[test]
fn test_apply_twice_equals_apply_once() {
    let dir = TempDir::new().unwrap();
    let target = write_target(dir.path(), "hosts", "127.0.0.1 localhost\n");
    let mutator = SafeFileMutator::new();

    let first = mutator.apply(&target, &hosts_rules()).unwrap();
    let after_first = fs::read(&target).unwrap();
    assert_eq!(first.changes.len(), 2);

    let second = mutator.apply(&target, &hosts_rules()).unwrap();
    let after_second = fs::read(&target).unwrap();

    assert_eq!(after_first, after_second);
    assert!(second.changes.is_empty(), "second run must be a no-op");

    // Exactly one facebook.com line despite two runs
    let contents = String::from_utf8(after_second).unwrap();
    assert_eq!(contents.matches("facebook.com").count(), 1);
}

#[test]
fn test_every_apply_leaves_a_fresh_backup() {
    let dir = TempDir::new().unwrap();
    let target = write_target(dir.path(), "hosts", "127.0.0.1 localhost\n");
    let mutator = SafeFileMutator::new();

    mutator.apply(&target, &hosts_rules()).unwrap();
    mutator.apply(&target, &hosts_rules()).unwrap();

    let backups = backup::list_backups(&target).unwrap();
    assert_eq!(backups.len(), 2);

    // The first backup holds the original bytes, the second holds the
    // state after the first apply
    let oldest = fs::read_to_string(&backups[0]).unwrap();
    assert_eq!(oldest, "127.0.0.1 localhost\n");
    let newest = fs::read_to_string(&backups[1]).unwrap();
    assert!(newest.contains("127.0.0.2 localhost"));
}

#[test]
fn test_non_self_matching_replace_errors_on_rerun() {
    let dir = TempDir::new().unwrap();
    let target = write_target(dir.path(), "hosts", "127.0.0.1 localhost\n");
    let mutator = SafeFileMutator::new();

    // The replacement no longer contains the pattern
    let rules = vec![Rule::replace(
        Matcher::Substring("127.0.0.1 localhost".into()),
        "127.0.0.2 localhost",
    )];

    mutator.apply(&target, &rules).unwrap();
    let after_first = fs::read(&target).unwrap();

    let err = mutator.apply(&target, &rules).unwrap_err();
    assert!(matches!(err, MutationError::ValidationFailed { .. }));
    assert_eq!(fs::read(&target).unwrap(), after_first);
}

#[test]
fn test_validation_failure_removes_scratch() {
    let dir = TempDir::new().unwrap();
    let target = write_target(dir.path(), "conf", "alpha\n");

    let rules = vec![Rule::replace(Matcher::Exact("missing".into()), "beta")];
    let err = SafeFileMutator::new().apply(&target, &rules).unwrap_err();
    assert!(matches!(err, MutationError::ValidationFailed { .. }));

    // Directory holds the target and the backup, nothing else
    let entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries.len(), 2, "unexpected files: {:?}", entries);
    assert!(entries.iter().any(|n| n == "conf"));
    assert!(entries.iter().any(|n| n.starts_with("conf.bak.")));
}

#[cfg(unix)]
#[test]
fn test_unwritable_directory_fails_backup_and_leaves_target() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    let target = write_target(&locked, "hosts", "127.0.0.1 localhost\n");
    let before = fs::read(&target).unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    // Running as root ignores permission bits; nothing to simulate then
    if fs::write(locked.join("probe"), b"x").is_ok() {
        fs::remove_file(locked.join("probe")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let err = SafeFileMutator::new()
        .apply(&target, &hosts_rules())
        .unwrap_err();

    assert!(matches!(err, MutationError::BackupFailed { .. }));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(fs::read(&target).unwrap(), before);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_permission_bits_survive_apply() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let target = write_target(dir.path(), "hosts", "127.0.0.1 localhost\n");
    fs::set_permissions(&target, fs::Permissions::from_mode(0o600)).unwrap();

    SafeFileMutator::new().apply(&target, &hosts_rules()).unwrap();

    let mode = fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_plan_then_apply_agree() {
    let dir = TempDir::new().unwrap();
    let target = write_target(dir.path(), "hosts", "127.0.0.1 localhost\n");
    let mutator = SafeFileMutator::new();

    let plan = mutator.plan(&target, &hosts_rules()).unwrap();
    let applied = mutator.apply(&target, &hosts_rules()).unwrap();

    assert_eq!(plan.changes, applied.changes);
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "127.0.0.2 localhost\n8.8.8.8 facebook.com\n"
    );
}
