use crate::report::MutationSummary;
use crate::rules::LineChange;
use colored::Colorize;
use miette::Result;

/// Terminal reporter with colored diff-style output
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report(&self, summary: &MutationSummary) -> Result<()> {
        if summary.changes.is_empty() {
            println!(
                "{}",
                "Nothing to change - every rule is already satisfied.".green()
            );
        } else {
            println!();
            let verb = if summary.dry_run { "Would apply" } else { "Applied" };
            println!(
                "{}",
                format!(
                    "{} {} change(s) to {}:",
                    verb,
                    summary.changes.len(),
                    summary.target.display()
                )
                .bold()
            );
            println!();
            Self::print_changes(&summary.changes);
        }

        if summary.dry_run {
            println!();
            println!("{}", "Dry run - nothing was written.".yellow());
        } else if let Some(backup) = &summary.backup {
            println!();
            println!(
                "{} Backup saved to: {}",
                "→".dimmed(),
                backup.display()
            );
        }

        Ok(())
    }

    /// Print edits as a unified-diff-style listing
    pub fn print_changes(changes: &[LineChange]) {
        for change in changes {
            match change {
                LineChange::Replaced { line, old, new } => {
                    println!("  {} {} {}", format!("{:>4}", line).dimmed(), "-".red(), old.red());
                    println!("  {} {} {}", format!("{:>4}", line).dimmed(), "+".green(), new.green());
                }
                LineChange::Inserted { line, new } => {
                    println!("  {} {} {}", format!("{:>4}", line).dimmed(), "+".green(), new.green());
                }
            }
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}
