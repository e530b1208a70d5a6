//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and the end-of-run summary. Diagnostics go through `tracing`
//! instead; this module is only for what the user is meant to read.

use crate::file_organizer::RunReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for operations
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortdir::output::OutputFormatter;
    /// OutputFormatter::success("photo.jpg → Images/photo.jpg");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates and returns a progress bar for file operations.
    ///
    /// The bar draws to stderr and stays hidden when stderr is not a terminal.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortdir::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the per-category table and the outcome counts of a run.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortdir::file_organizer::RunReport;
    /// use sortdir::output::OutputFormatter;
    ///
    /// let report = RunReport::new();
    /// OutputFormatter::summary(&report, false);
    /// ```
    pub fn summary(report: &RunReport, dry_run: bool) {
        Self::header(if dry_run { "DRY RUN SUMMARY" } else { "SUMMARY" });

        if !report.category_counts.is_empty() {
            let width = report
                .category_counts
                .keys()
                .map(|name| name.len())
                .max()
                .unwrap_or(0)
                .max(8);

            println!(
                "{:<width$} | {}",
                "Category".bold(),
                "Files".bold(),
                width = width
            );
            println!("{}", "-".repeat(width + 10));
            for (category, count) in &report.category_counts {
                println!(
                    "{:<width$} | {} {}",
                    category,
                    count.to_string().green(),
                    file_word(*count),
                    width = width
                );
            }
            println!("{}", "-".repeat(width + 10));
        }

        println!("Planned:   {}", report.planned);
        if !dry_run {
            println!("Succeeded: {}", report.succeeded.to_string().green());
        }
        println!("Skipped:   {}", report.skipped.len());
        let failed = report.failed.len().to_string();
        println!(
            "Failed:    {}",
            if report.failed.is_empty() {
                failed.normal()
            } else {
                failed.red().bold()
            }
        );

        for (path, reason) in &report.failed {
            Self::error(&format!("{}: {}", path.display(), reason));
        }
    }
}

fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_word() {
        assert_eq!(file_word(0), "files");
        assert_eq!(file_word(1), "file");
        assert_eq!(file_word(7), "files");
    }
}
