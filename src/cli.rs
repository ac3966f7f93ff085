//! Command-line interface.
//!
//! Parses arguments, loads settings, picks the extension resolver and the
//! disposal method, runs the batch or undo, and renders the outcome.

use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::batch::{BatchEvent, BatchRequest, Organizer};
use crate::config::{DisposalMethod, Settings};
use crate::output::OutputFormatter;
use crate::report::BatchReport;
use crate::resolver::{ExtensionResolver, InteractivePrompt, RejectUnknown};
use crate::undo::UndoManager;

#[derive(Debug, Parser)]
#[command(name = "datedir", version, about = "Sort files into a {year}/{category} tree by date")]
pub struct Cli {
    /// Settings file (default: ./.datedirrc.toml, then ~/.config/datedir/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print every file as it is moved and enable debug diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move files from the origin into the dated destination tree
    Organize(OrganizeArgs),
    /// Put back the files moved by the last run into a destination
    Undo {
        /// Destination root of the run to undo
        #[arg(short, long, value_name = "DIR")]
        destination: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Directory to empty out
    #[arg(short, long, value_name = "DIR")]
    pub origin: PathBuf,

    /// Root of the {year}/{category} tree
    #[arg(short, long, value_name = "DIR")]
    pub destination: PathBuf,

    /// Also copy every moved file under this root
    #[arg(short, long, value_name = "DIR")]
    pub copy: Option<PathBuf>,

    /// Show what would happen without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt for unknown extensions; their files stay in the origin
    #[arg(long)]
    pub non_interactive: bool,

    /// Category mapping store to use instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub mappings: Option<PathBuf>,

    /// Leave emptied directories in the origin
    #[arg(long)]
    pub keep_dirs: bool,
}

/// The `tracing` filter directive for the chosen verbosity.
pub fn log_directive(verbose: bool) -> &'static str {
    if verbose { "warn,datedir=debug" } else { "warn" }
}

/// Runs a parsed command line. Returns whether the run finished without
/// recoverable errors; fatal errors come back as `Err` with a message.
pub fn run_cli(cli: Cli) -> Result<bool, String> {
    let mut settings = Settings::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    match cli.command {
        Command::Organize(args) => {
            if let Some(path) = &args.mappings {
                settings.mappings.path = Some(path.clone());
            }
            if args.keep_dirs {
                settings.disposal.method = DisposalMethod::Keep;
            }
            organize(&settings, &args, cli.verbose)
        }
        Command::Undo { destination } => undo(&destination),
    }
}

fn organize(settings: &Settings, args: &OrganizeArgs, verbose: bool) -> Result<bool, String> {
    let mut organizer = Organizer::from_settings(settings).map_err(|e| e.to_string())?;

    let mut request = BatchRequest::new(&args.origin, &args.destination).dry_run(args.dry_run);
    if let Some(copy) = &args.copy {
        request = request.with_copy_destination(copy);
    }

    let mut resolver: Box<dyn ExtensionResolver> =
        if args.non_interactive || args.dry_run || !std::io::stdin().is_terminal() {
            Box::new(RejectUnknown)
        } else {
            Box::new(InteractivePrompt::stdio())
        };

    if args.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Analyzing {} (nothing will be changed)",
            args.origin.display()
        ));
    } else {
        OutputFormatter::info(&format!(
            "Organizing {} into {}",
            args.origin.display(),
            args.destination.display()
        ));
    }

    let mut pb = None;
    let report = organizer
        .run(&request, resolver.as_mut(), &mut |event| match event {
            BatchEvent::Started { files } => {
                pb = Some(OutputFormatter::create_progress_bar(files as u64));
            }
            BatchEvent::Moved { from, to } if verbose => {
                if let Some(pb) = &pb {
                    pb.println(OutputFormatter::move_line(from, to, false));
                }
            }
            BatchEvent::Planned { from, to } => {
                if let Some(pb) = &pb {
                    pb.println(OutputFormatter::move_line(from, to, true));
                }
            }
            BatchEvent::Processed => {
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            }
            _ => {}
        })
        .map_err(|e| e.to_string())?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    render_report(&report, &args.destination);
    Ok(!report.has_errors())
}

fn render_report(report: &BatchReport, destination: &Path) {
    if report.filtered > 0 {
        OutputFormatter::plain(&format!("Skipped by filters: {}", report.filtered));
    }
    if report.extensions_assigned > 0 {
        OutputFormatter::info(&format!(
            "New extensions mapped: {}",
            report.extensions_assigned
        ));
    }

    OutputFormatter::summary_table(&report.category_counts, report.relocated());

    if !report.disposed.is_empty() {
        OutputFormatter::plain(&format!("Directories disposed: {}", report.disposed.len()));
    }
    for warning in &report.warnings {
        OutputFormatter::warning(warning);
    }

    OutputFormatter::error_summary(report.error_groups());

    if report.dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    } else if !report.moved.is_empty() {
        OutputFormatter::success(&format!("Moved {} files", report.moved.len()));
        OutputFormatter::plain(&format!(
            "History saved. Use 'datedir undo -d {}' to revert.",
            destination.display()
        ));
    }
}

fn undo(destination: &Path) -> Result<bool, String> {
    OutputFormatter::info(&format!("Undoing last run into {}", destination.display()));

    let report = UndoManager::undo(destination).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("Restored: {}", report.restored_files));

    for (original, backup) in &report.backups {
        OutputFormatter::warning(&format!(
            "{} was in the way, kept as {}",
            original.display(),
            backup.display()
        ));
    }

    if !report.skipped_files.is_empty() {
        OutputFormatter::warning(&format!("Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::plain(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::error(&format!("Failed: {}", report.failed_restores.len()));
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.journal_deleted {
        OutputFormatter::warning("History kept so the undo can be retried.");
    }

    Ok(report.is_complete_success())
}
