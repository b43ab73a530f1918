use crate::report::MutationSummary;
use crate::rules::LineChange;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, summary: &MutationSummary) -> Result<()> {
        let report = JsonReport::from_summary(summary);
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    target: String,
    dry_run: bool,
    backup: Option<String>,
    total_changes: usize,
    changes: &'a [LineChange],
}

impl<'a> JsonReport<'a> {
    fn from_summary(summary: &'a MutationSummary) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            target: summary.target.display().to_string(),
            dry_run: summary.dry_run,
            backup: summary.backup.as_ref().map(|p| p.display().to_string()),
            total_changes: summary.changes.len(),
            changes: &summary.changes,
        }
    }
}
