//! Console output.
//!
//! Everything the user reads goes through [`OutputFormatter`] so styling
//! stays consistent. Diagnostics go through `tracing` instead.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::report::ErrorKind;

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::success("Organized 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with a cross, on stderr.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::error("Could not read the mapping store");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning in yellow with a warning sign.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::warning("History kept so the undo can be retried.");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an informational message in cyan.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::info("Organizing ./inbox into ./sorted");
    /// ```
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a message without styling.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::plain("Skipped by filters: 3");
    /// ```
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a bold section header preceded by a blank line.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::header("SUMMARY");
    /// ```
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a yellow message prefixed with `[DRY RUN]`.
    ///
    /// ```no_run
    /// use datedir::output::OutputFormatter;
    /// OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    /// ```
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Progress bar for `total` files.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// One line per moved (or planned) file.
    pub fn move_line(from: &Path, to: &Path, dry_run: bool) -> String {
        let arrow = if dry_run { "→".yellow() } else { "→".green() };
        format!("  {} {} {}", from.display(), arrow, to.display())
    }

    /// Table of files per category.
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("Category".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Error summary grouped by kind, each entry pairing path and reason.
    pub fn error_summary<'a, I>(groups: I)
    where
        I: IntoIterator<Item = (ErrorKind, &'a [(PathBuf, String)])>,
    {
        let mut printed_header = false;
        for (kind, entries) in groups {
            if !printed_header {
                Self::header("ERRORS");
                printed_header = true;
            }
            eprintln!("{} ({}):", kind.to_string().red().bold(), entries.len());
            for (path, reason) in entries {
                eprintln!("  {} {}: {}", "✗".red(), path.display(), reason);
            }
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
