mod loader;

pub use loader::{MatchKind, RuleFile, RuleSpec};
