use crate::rules::{Matcher, Rule, RuleParseError};
use miette::{IntoDiagnostic, Result, WrapErr};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A rule file: an ordered list of edits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleFile {
    pub rules: Vec<RuleSpec>,
}

/// One rule as written in a YAML or TOML rule file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Text or regex the rule matches lines against
    pub pattern: String,

    /// How the pattern is interpreted
    #[serde(default)]
    pub kind: MatchKind,

    /// The line that replaces matches (or is appended, for `ensure`)
    pub replacement: String,

    /// Append the replacement only when nothing matches, instead of
    /// rewriting matching lines
    #[serde(default)]
    pub ensure: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    #[default]
    Substring,
    Prefix,
    Exact,
    Regex,
}

impl RuleSpec {
    /// Compile into a runtime [`Rule`], validating regex patterns
    pub fn compile(&self) -> Result<Rule, RuleParseError> {
        if self.pattern.is_empty() {
            return Err(RuleParseError::EmptyPattern(self.replacement.clone()));
        }

        let matcher = match self.kind {
            MatchKind::Substring => Matcher::Substring(self.pattern.clone()),
            MatchKind::Prefix => Matcher::Prefix(self.pattern.clone()),
            MatchKind::Exact => Matcher::Exact(self.pattern.clone()),
            MatchKind::Regex => {
                let re = Regex::new(&self.pattern).map_err(|source| RuleParseError::BadRegex {
                    pattern: self.pattern.clone(),
                    source,
                })?;
                Matcher::Regex(re)
            }
        };

        Ok(Rule {
            matcher,
            replacement: self.replacement.clone(),
            insert_if_absent: self.ensure,
        })
    }
}

impl RuleFile {
    /// Load a rule file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read rule file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML rule file"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML rule file"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(rules) = serde_yaml::from_str(&contents) {
                    Ok(rules)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse rule file")
                }
            }
        }
    }

    /// Probe default rule-file names next to the target file.
    ///
    /// Returns an empty rule set when none exists; command-line rules can
    /// still be supplied on top.
    pub fn from_default_locations(target: &Path) -> Result<Self> {
        let default_names = [
            ".confmut.yml",
            ".confmut.yaml",
            ".confmut.toml",
            "confmut.yml",
            "confmut.yaml",
            "confmut.toml",
        ];

        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        for name in &default_names {
            let path = dir.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Compile every spec, preserving declared order
    pub fn compile(&self) -> Result<Vec<Rule>, RuleParseError> {
        self.rules.iter().map(RuleSpec::compile).collect()
    }
}
