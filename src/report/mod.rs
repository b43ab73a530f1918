mod json;
mod terminal;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

use crate::rules::LineChange;
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

/// Output format for mutation reports
#[derive(Debug, Clone, Default)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

/// Outcome of one plan or apply, as handed to reporters
#[derive(Debug, Serialize)]
pub struct MutationSummary {
    /// The mutated (or previewed) file
    pub target: PathBuf,

    /// True when nothing was written
    pub dry_run: bool,

    /// Backup written before the edit, absent on dry runs
    pub backup: Option<PathBuf>,

    /// Edits in application order
    pub changes: Vec<LineChange>,
}

/// Reporter for mutation outcomes
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
        }
    }

    /// Report the outcome in the configured format
    pub fn report(&self, summary: &MutationSummary) -> Result<()> {
        match &self.format {
            ReportFormat::Terminal => {
                let reporter = TerminalReporter::new();
                reporter.report(summary)
            }
            ReportFormat::Json => {
                let reporter = JsonReporter::new(self.output_path.clone());
                reporter.report(summary)
            }
        }
    }
}
