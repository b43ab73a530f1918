//! Rule model and in-memory line transformation.
//!
//! A [`Rule`] pairs a [`Matcher`] with a replacement line. Rules apply in
//! declared order to an ordered list of lines: replace rules rewrite every
//! matching line, insert-if-absent rules append their line only when no
//! existing line matches.

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// How a rule decides whether a line belongs to it
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Line contains the needle anywhere (grep -F style)
    Substring(String),
    /// Line starts with the prefix
    Prefix(String),
    /// Line equals the pattern exactly
    Exact(String),
    /// Line matches the regex (unanchored)
    Regex(Regex),
}

impl Matcher {
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Matcher::Substring(needle) => line.contains(needle.as_str()),
            Matcher::Prefix(prefix) => line.starts_with(prefix.as_str()),
            Matcher::Exact(pattern) => line == pattern,
            Matcher::Regex(re) => re.is_match(line),
        }
    }

    /// The raw pattern text, for labels and error messages
    pub fn pattern(&self) -> &str {
        match self {
            Matcher::Substring(s) | Matcher::Prefix(s) | Matcher::Exact(s) => s,
            Matcher::Regex(re) => re.as_str(),
        }
    }
}

/// Errors while turning user-supplied rule text into a [`Rule`]
#[derive(Error, Debug)]
pub enum RuleParseError {
    #[error("rule `{0}` is missing `=` between pattern and replacement")]
    MissingSeparator(String),
    #[error("rule `{0}` has an empty match pattern")]
    EmptyPattern(String),
    #[error("invalid regex `{pattern}`")]
    BadRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One line-level edit
#[derive(Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub replacement: String,
    pub insert_if_absent: bool,
}

impl Rule {
    /// A rule that rewrites every matching line
    pub fn replace(matcher: Matcher, replacement: impl Into<String>) -> Self {
        Self {
            matcher,
            replacement: replacement.into(),
            insert_if_absent: false,
        }
    }

    /// A rule that appends its line only when nothing matches
    pub fn ensure(matcher: Matcher, replacement: impl Into<String>) -> Self {
        Self {
            matcher,
            replacement: replacement.into(),
            insert_if_absent: true,
        }
    }

    /// Parse a `PATTERN=REPLACEMENT` spec as given on the command line.
    ///
    /// The first `=` separates pattern from replacement; the pattern is a
    /// substring matcher. An empty replacement produces a blank line.
    pub fn parse_spec(spec: &str, insert_if_absent: bool) -> Result<Self, RuleParseError> {
        let (pattern, replacement) = spec
            .split_once('=')
            .ok_or_else(|| RuleParseError::MissingSeparator(spec.to_string()))?;

        if pattern.is_empty() {
            return Err(RuleParseError::EmptyPattern(spec.to_string()));
        }

        Ok(Self {
            matcher: Matcher::Substring(pattern.to_string()),
            replacement: replacement.to_string(),
            insert_if_absent,
        })
    }

    /// Human-readable label for error messages and reports
    pub fn label(&self) -> String {
        if self.insert_if_absent {
            format!("ensure `{}` -> `{}`", self.matcher.pattern(), self.replacement)
        } else {
            format!("replace `{}` -> `{}`", self.matcher.pattern(), self.replacement)
        }
    }
}

/// A single recorded edit, 1-based line numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineChange {
    Replaced {
        line: usize,
        old: String,
        new: String,
    },
    Inserted {
        line: usize,
        new: String,
    },
}

/// Result of applying rules to a line list in memory
#[derive(Debug)]
pub struct RuleApplication {
    /// The fully-edited line list
    pub candidate: Vec<String>,
    /// Every edit that was made, in order
    pub changes: Vec<LineChange>,
    /// Labels of replace rules that matched nothing
    pub unsatisfied: Vec<String>,
}

/// Apply rules in declared order, recording each edit.
///
/// A replace rule that matches no line is recorded in `unsatisfied` rather
/// than failing here; the caller decides whether that aborts the operation.
/// Rewriting a line to its current content is a no-op and records nothing.
pub fn apply_rules(lines: &[String], rules: &[Rule]) -> RuleApplication {
    let mut candidate: Vec<String> = lines.to_vec();
    let mut changes = Vec::new();
    let mut unsatisfied = Vec::new();

    for rule in rules {
        if rule.insert_if_absent {
            if !candidate.iter().any(|line| rule.matcher.matches(line)) {
                candidate.push(rule.replacement.clone());
                changes.push(LineChange::Inserted {
                    line: candidate.len(),
                    new: rule.replacement.clone(),
                });
            }
        } else {
            let mut matched = false;
            for (idx, line) in candidate.iter_mut().enumerate() {
                if rule.matcher.matches(line) {
                    matched = true;
                    if *line != rule.replacement {
                        changes.push(LineChange::Replaced {
                            line: idx + 1,
                            old: line.clone(),
                            new: rule.replacement.clone(),
                        });
                        *line = rule.replacement.clone();
                    }
                }
            }
            if !matched {
                unsatisfied.push(rule.label());
            }
        }
    }

    RuleApplication {
        candidate,
        changes,
        unsatisfied,
    }
}

/// Check every rule's post-condition against a final line list.
///
/// - insert-if-absent: some line must match the rule's pattern. This also
///   rejects rules whose inserted line does not match their own pattern,
///   which would duplicate on the next run.
/// - replace: some line must equal the replacement, unless a later rule
///   legitimately rewrote the replacement line.
///
/// Returns the label of the first failing rule.
pub fn check_post_conditions(lines: &[String], rules: &[Rule]) -> Result<(), String> {
    for (idx, rule) in rules.iter().enumerate() {
        let holds = if rule.insert_if_absent {
            lines.iter().any(|line| rule.matcher.matches(line))
        } else {
            lines.iter().any(|line| *line == rule.replacement)
                || superseded_by_later(&rule.replacement, &rules[idx + 1..])
        };

        if !holds {
            return Err(rule.label());
        }
    }
    Ok(())
}

/// Would a later replace rule rewrite this line to something else?
fn superseded_by_later(line: &str, later: &[Rule]) -> bool {
    later
        .iter()
        .any(|r| !r.insert_if_absent && r.matcher.matches(line) && r.replacement != line)
}
