//! confmut - Safe, atomic line-oriented mutation of text configuration files
//!
//! This library edits files like `/etc/hosts` without ever exposing a
//! half-written state to other readers.
//!
//! # Architecture
//!
//! One mutation runs through:
//! 1. **Snapshot** - Read the target into an ordered line list
//! 2. **Backup** - Write and verify a timestamped sibling copy
//! 3. **Candidate** - Apply the rules in declared order, in memory
//! 4. **Staging** - Write the candidate to a scratch file in the target's
//!    directory
//! 5. **Validation** - Re-read the scratch file and check every rule's
//!    post-condition
//! 6. **Replace** - Atomically rename the scratch file over the target
//!
//! Any failure before step 6 leaves the target byte-identical to its state
//! at call entry.

pub mod backup;
pub mod config;
pub mod mutator;
pub mod report;
pub mod rules;

pub use config::{MatchKind, RuleFile, RuleSpec};
pub use mutator::{AppliedMutation, MutationError, MutationPlan, SafeFileMutator};
pub use report::{MutationSummary, ReportFormat, Reporter};
pub use rules::{apply_rules, check_post_conditions, LineChange, Matcher, Rule, RuleParseError};
