//! Safe mutation of a text file with guaranteed rollback.
//!
//! [`SafeFileMutator::apply`] never leaves the target half-edited: a
//! verified backup is written first, the edit is staged in a scratch file in
//! the target's directory, validated, and swapped in with one atomic
//! rename. Readers see either the old bytes or the new bytes, nothing in
//! between. On any error before the rename the target is byte-identical to
//! its state at call entry.
//!
//! Concurrent calls against the same path are not serialized here; a caller
//! that needs cross-process exclusion must bring its own lock.

use crate::backup;
use crate::rules::{apply_rules, check_post_conditions, LineChange, Rule};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Mutation errors, one variant per failure stage
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("target file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("cannot read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("permission denied on {path}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write backup beside {path}; target left untouched")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rule {rule} is not satisfied by the edited file; target left untouched")]
    ValidationFailed { rule: String },

    #[error("could not stage scratch file in {dir}; target left untouched")]
    ScratchFailed {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not replace {path}; scratch copy kept at {scratch}")]
    ReplaceFailed {
        path: PathBuf,
        scratch: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MutationError {
    /// Distinct process exit code per error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            MutationError::NotFound { .. } => 2,
            MutationError::ReadFailed { .. } => 3,
            MutationError::PermissionDenied { .. } => 4,
            MutationError::BackupFailed { .. } => 5,
            MutationError::ValidationFailed { .. } => 6,
            MutationError::ScratchFailed { .. } => 7,
            MutationError::ReplaceFailed { .. } => 8,
        }
    }

    fn classify_read(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => MutationError::NotFound { path },
            io::ErrorKind::PermissionDenied => MutationError::PermissionDenied { path, source },
            _ => MutationError::ReadFailed { path, source },
        }
    }
}

/// What an apply would do, computed without side effects
#[derive(Debug)]
pub struct MutationPlan {
    /// The fully-edited line list
    pub candidate: Vec<String>,
    /// Edits in application order
    pub changes: Vec<LineChange>,
}

/// Outcome of a successful apply
#[derive(Debug)]
pub struct AppliedMutation {
    /// The verified backup written before the edit
    pub backup_path: PathBuf,
    /// Edits in application order
    pub changes: Vec<LineChange>,
}

/// Target file snapshot taken at the start of an operation
struct Snapshot {
    raw: String,
    lines: Vec<String>,
    permissions: fs::Permissions,
    trailing_newline: bool,
}

/// Applies ordered line rules to a file, old-or-new atomically
pub struct SafeFileMutator;

impl SafeFileMutator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the edit without touching the filesystem.
    ///
    /// Runs the same rule application and post-condition checks as
    /// [`apply`](Self::apply), so a plan that succeeds here will not fail
    /// validation later unless the file changes underneath.
    pub fn plan(&self, path: &Path, rules: &[Rule]) -> Result<MutationPlan, MutationError> {
        let snapshot = self.read_snapshot(path)?;
        let (candidate, changes) = self.build_candidate(&snapshot, rules)?;
        check_post_conditions(&candidate, rules)
            .map_err(|rule| MutationError::ValidationFailed { rule })?;

        Ok(MutationPlan { candidate, changes })
    }

    /// Apply rules to the file, in stages:
    /// snapshot, backup, candidate, scratch, validate, atomic rename.
    ///
    /// The backup persists on every call that gets past the backup stage,
    /// success or failure; retention is the caller's business. A validation
    /// failure deletes the scratch file and leaves the target untouched. A
    /// rename failure keeps the scratch file for inspection; the rename is
    /// all-or-nothing, so the target is still untouched.
    pub fn apply(&self, path: &Path, rules: &[Rule]) -> Result<AppliedMutation, MutationError> {
        let snapshot = self.read_snapshot(path)?;

        let backup_path =
            backup::write_backup(path, snapshot.raw.as_bytes()).map_err(|source| {
                MutationError::BackupFailed {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let (candidate, changes) = self.build_candidate(&snapshot, rules)?;
        let rendered = render_lines(&candidate, snapshot.trailing_newline);

        let scratch_dir = parent_dir(path).to_path_buf();
        let scratch = self
            .write_scratch(&scratch_dir, rendered.as_bytes())
            .map_err(|source| MutationError::ScratchFailed {
                dir: scratch_dir.clone(),
                source,
            })?;

        // Validate against what actually landed on disk, not what we think
        // we wrote.
        let reread = fs::read_to_string(scratch.path()).map_err(|source| {
            MutationError::ScratchFailed {
                dir: scratch_dir.clone(),
                source,
            }
        })?;
        if reread != rendered {
            return Err(MutationError::ScratchFailed {
                dir: scratch_dir,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    "scratch file does not match the staged content",
                ),
            });
        }
        let reread_lines: Vec<String> = reread.lines().map(String::from).collect();
        check_post_conditions(&reread_lines, rules)
            .map_err(|rule| MutationError::ValidationFailed { rule })?;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(source) = fs::set_permissions(scratch.path(), snapshot.permissions.clone()) {
            let _ = scratch.keep();
            return Err(MutationError::ReplaceFailed {
                path: path.to_path_buf(),
                scratch: scratch_path,
                source,
            });
        }

        match scratch.persist(path) {
            Ok(_) => {
                info!(
                    "Replaced {} atomically ({} change(s), backup {})",
                    path.display(),
                    changes.len(),
                    backup_path.display()
                );
                Ok(AppliedMutation {
                    backup_path,
                    changes,
                })
            }
            Err(err) => {
                let source = err.error;
                let _ = err.file.keep();
                Err(MutationError::ReplaceFailed {
                    path: path.to_path_buf(),
                    scratch: scratch_path,
                    source,
                })
            }
        }
    }

    fn read_snapshot(&self, path: &Path) -> Result<Snapshot, MutationError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| MutationError::classify_read(path, source))?;
        let permissions = fs::metadata(path)
            .map_err(|source| MutationError::classify_read(path, source))?
            .permissions();

        let lines: Vec<String> = raw.lines().map(String::from).collect();
        debug!("Read {} line(s) from {}", lines.len(), path.display());

        Ok(Snapshot {
            trailing_newline: raw.ends_with('\n') || raw.is_empty(),
            lines,
            permissions,
            raw,
        })
    }

    fn build_candidate(
        &self,
        snapshot: &Snapshot,
        rules: &[Rule],
    ) -> Result<(Vec<String>, Vec<LineChange>), MutationError> {
        let application = apply_rules(&snapshot.lines, rules);
        if let Some(rule) = application.unsatisfied.into_iter().next() {
            return Err(MutationError::ValidationFailed { rule });
        }
        Ok((application.candidate, application.changes))
    }

    fn write_scratch(&self, dir: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
        let mut scratch = NamedTempFile::new_in(dir)?;
        scratch.write_all(bytes)?;
        scratch.flush()?;
        Ok(scratch)
    }
}

impl Default for SafeFileMutator {
    fn default() -> Self {
        Self::new()
    }
}

fn render_lines(lines: &[String], trailing_newline: bool) -> String {
    let mut rendered = lines.join("\n");
    if trailing_newline && !rendered.is_empty() {
        rendered.push('\n');
    }
    rendered
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
