use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

mod backup;
mod config;
mod mutator;
mod report;
mod rules;

use config::RuleFile;
use mutator::{MutationError, SafeFileMutator};
use report::{MutationSummary, Reporter, TerminalReporter};
use rules::Rule;

/// confmut - Safe, atomic line-oriented mutation of text configuration files
#[derive(Parser, Debug)]
#[command(name = "confmut")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target file to mutate
    path: PathBuf,

    /// Replace rules as PATTERN=REPLACEMENT; every line containing PATTERN
    /// becomes REPLACEMENT (can be specified multiple times)
    #[arg(short, long = "rule", value_name = "PATTERN=REPLACEMENT")]
    rule: Vec<String>,

    /// Insert-if-absent rules as PATTERN=LINE; LINE is appended when no
    /// line contains PATTERN (can be specified multiple times)
    #[arg(short, long = "ensure", value_name = "PATTERN=LINE")]
    ensure: Vec<String>,

    /// Rule file (YAML or TOML); defaults to .confmut.{yml,yaml,toml}
    /// next to the target
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Show planned changes without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Ask for confirmation before applying
    #[arg(short, long)]
    interactive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List existing backups for the target and exit
    #[arg(long)]
    list_backups: bool,

    /// Delete all but the newest N backups for the target and exit
    #[arg(long, value_name = "N")]
    prune_backups: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for report::ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => report::ReportFormat::Terminal,
            OutputFormat::Json => report::ReportFormat::Json,
        }
    }
}

/// CLI-level errors: mutation failures carry their own exit code,
/// everything else exits 1
enum AppError {
    Mutation(MutationError),
    Setup(miette::Report),
}

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        AppError::Mutation(err)
    }
}

impl From<miette::Report> for AppError {
    fn from(report: miette::Report) -> Self {
        AppError::Setup(report)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    info!("confmut v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(()) => {}
        Err(AppError::Mutation(err)) => {
            let code = err.exit_code();
            eprintln!("{}: {}", "error".red().bold(), err);
            let mut cause = std::error::Error::source(&err);
            while let Some(current) = cause {
                eprintln!("  {}: {}", "caused by".dimmed(), current);
                cause = current.source();
            }
            std::process::exit(code);
        }
        Err(AppError::Setup(report)) => {
            eprintln!("{:?}", report);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    if cli.list_backups {
        return list_backups(&cli.path);
    }
    if let Some(keep) = cli.prune_backups {
        return prune_backups(&cli.path, keep);
    }

    let rules = load_rules(cli)?;
    let mutator = SafeFileMutator::new();
    let reporter = Reporter::new(cli.format.clone().into(), cli.output.clone());

    if cli.dry_run {
        let plan = mutator.plan(&cli.path, &rules)?;
        let summary = MutationSummary {
            target: cli.path.clone(),
            dry_run: true,
            backup: None,
            changes: plan.changes,
        };
        reporter.report(&summary)?;
        return Ok(());
    }

    if cli.interactive && !confirm_apply(cli, &mutator, &rules)? {
        println!("{}", "Aborted - nothing was changed.".yellow());
        return Ok(());
    }

    let applied = mutator.apply(&cli.path, &rules)?;
    info!(
        "Applied {} change(s) to {}",
        applied.changes.len(),
        cli.path.display()
    );

    let summary = MutationSummary {
        target: cli.path.clone(),
        dry_run: false,
        backup: Some(applied.backup_path),
        changes: applied.changes,
    };
    reporter.report(&summary)?;

    Ok(())
}

/// Preview the planned changes and ask before touching the file
fn confirm_apply(
    cli: &Cli,
    mutator: &SafeFileMutator,
    rules: &[Rule],
) -> Result<bool, AppError> {
    use dialoguer::{theme::ColorfulTheme, Confirm};
    use miette::IntoDiagnostic;

    let plan = mutator.plan(&cli.path, rules)?;

    if plan.changes.is_empty() {
        // Nothing to preview; applying still refreshes the backup
        return Ok(true);
    }

    println!();
    println!(
        "{}",
        format!("Planned changes to {}:", cli.path.display()).cyan().bold()
    );
    println!();
    TerminalReporter::print_changes(&plan.changes);
    println!();

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Apply {} change(s)?", plan.changes.len()))
        .default(false)
        .interact()
        .into_diagnostic()
        .map_err(AppError::Setup)?;

    Ok(confirmed)
}

fn load_rules(cli: &Cli) -> Result<Vec<Rule>, AppError> {
    use miette::IntoDiagnostic;

    let rule_file = if let Some(path) = &cli.rules {
        RuleFile::from_file(path)?
    } else {
        RuleFile::from_default_locations(&cli.path)?
    };

    // Declared order: rule-file rules first, then command-line rules
    let mut rules = rule_file.compile().into_diagnostic()?;

    for spec in &cli.rule {
        rules.push(Rule::parse_spec(spec, false).into_diagnostic()?);
    }
    for spec in &cli.ensure {
        rules.push(Rule::parse_spec(spec, true).into_diagnostic()?);
    }

    if rules.is_empty() {
        return Err(AppError::Setup(miette::miette!(
            "no rules given; use --rule/--ensure or a rule file"
        )));
    }

    info!("Loaded {} rule(s)", rules.len());
    Ok(rules)
}

fn list_backups(path: &PathBuf) -> Result<(), AppError> {
    use miette::IntoDiagnostic;

    let backups = backup::list_backups(path)
        .into_diagnostic()
        .map_err(AppError::Setup)?;

    if backups.is_empty() {
        println!("{}", format!("No backups for {}", path.display()).yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} backup(s) for {}:", backups.len(), path.display()).bold()
    );
    for backup in backups {
        println!("  {}", backup.display());
    }
    Ok(())
}

fn prune_backups(path: &PathBuf, keep: usize) -> Result<(), AppError> {
    use miette::IntoDiagnostic;

    let removed = backup::prune_old_backups(path, keep)
        .into_diagnostic()
        .map_err(AppError::Setup)?;

    if removed.is_empty() {
        println!("{}", "Nothing to prune.".green());
    } else {
        println!(
            "{}",
            format!("Pruned {} backup(s), kept the newest {}.", removed.len(), keep).green()
        );
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
