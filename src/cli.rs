//! Command-line interface module for sortdir.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - Rules loading and source/output resolution
//! - Planning and executing placements, one file at a time
//! - The end-of-run summary and exit code

use crate::config::{ConfigError, RulesSource, load_rules};
use crate::file_organizer::{FileOrganizer, OrganizeError, RunReport};
use crate::output::OutputFormatter;
use crate::planner::{ActionKind, PlacementDecision, PlacementPlanner, PlannerOptions, TransferMode};
use crate::scan::scan_directory;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exit code when every file was placed (or previewed).
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code when at least one file failed.
pub const EXIT_FILE_FAILURES: u8 = 1;
/// Exit code when the run could not start: bad rules or bad source directory.
pub const EXIT_FATAL: u8 = 2;

/// Sort files into category folders by extension.
#[derive(Debug, Clone, Parser)]
#[command(name = "sortdir", version, about, long_about = None)]
pub struct Cli {
    /// Directory whose files should be sorted
    pub source: PathBuf,

    /// Rules file (TOML, or JSON when it ends in .json)
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Destination root; defaults to sorting in place
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report planned actions without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Normalize file names (spaces to underscores, odd characters dropped)
    #[arg(long)]
    pub rename: bool,

    /// Copy files even when sorting in place
    #[arg(long, conflicts_with = "move_files")]
    pub copy: bool,

    /// Move files even when an output directory is given
    #[arg(long = "move")]
    pub move_files: bool,

    /// Show debug diagnostics
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Converts parsed arguments into run options.
    pub fn to_options(&self) -> OrganizeOptions {
        let mode = if self.copy {
            Some(TransferMode::Copy)
        } else if self.move_files {
            Some(TransferMode::Move)
        } else {
            None
        };

        OrganizeOptions {
            source: self.source.clone(),
            rules: self.rules.clone(),
            output: self.output.clone(),
            dry_run: self.dry_run,
            rename: self.rename,
            mode,
        }
    }
}

/// Everything a run needs besides the filesystem.
#[derive(Debug, Clone, Default)]
pub struct OrganizeOptions {
    pub source: PathBuf,
    pub rules: Option<PathBuf>,
    /// `None` sorts in place.
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub rename: bool,
    /// `None` picks move for in-place runs and copy otherwise.
    pub mode: Option<TransferMode>,
}

/// Errors that stop a run before any file is touched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Runs with already-parsed arguments and returns the process exit code.
pub fn run_cli(cli: &Cli) -> u8 {
    let result = organize(&cli.to_options());
    if let Err(e) = &result {
        OutputFormatter::error(&format!("Error: {}", e));
    }
    exit_code(&result)
}

/// Maps a run result to the process exit code.
pub fn exit_code(result: &Result<RunReport, RunError>) -> u8 {
    match result {
        Ok(report) if report.is_complete_success() => EXIT_SUCCESS,
        Ok(_) => EXIT_FILE_FAILURES,
        Err(_) => EXIT_FATAL,
    }
}

/// Sorts the files of a source directory into category folders.
///
/// This function:
/// 1. Loads and compiles the rules (fatal on error)
/// 2. Resolves the source and output roots (fatal on error)
/// 3. Lists all files up front, in name order
/// 4. Plans each file and, unless this is a dry run, copies or moves it
/// 5. Prints a summary and returns the per-file outcomes
///
/// Per-file failures are recorded in the report and never abort the run.
///
/// # Examples
///
/// ```no_run
/// use sortdir::cli::{organize, OrganizeOptions};
/// use std::path::PathBuf;
///
/// let options = OrganizeOptions {
///     source: PathBuf::from("/home/user/Downloads"),
///     dry_run: true,
///     ..Default::default()
/// };
/// match organize(&options) {
///     Ok(report) => println!("{} files planned", report.planned),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn organize(options: &OrganizeOptions) -> Result<RunReport, RunError> {
    let rules = load_rules(options.rules.as_deref())?;
    let source_root = resolve_source_root(&options.source)?;
    let output_root = match &options.output {
        Some(path) => resolve_output_root(path),
        None => source_root.clone(),
    };
    let in_place = output_root == source_root;
    let mode = options.mode.unwrap_or(if in_place {
        TransferMode::Move
    } else {
        TransferMode::Copy
    });

    print_banner(options, &source_root, &output_root, mode, &rules.source);

    let exclude_root = (!in_place && output_root.starts_with(&source_root))
        .then_some(output_root.as_path());
    let scan = scan_directory(&source_root, exclude_root, &rules.filters);

    let mut report = RunReport::new();
    for (path, reason) in scan.errors {
        OutputFormatter::warning(&format!("Cannot read {}: {}", path.display(), reason));
        report.record_failure(path, reason);
    }

    if scan.entries.is_empty() {
        OutputFormatter::info("No files found to sort.");
        OutputFormatter::summary(&report, options.dry_run);
        return Ok(report);
    }

    let mut planner = PlacementPlanner::new(
        &rules.table,
        PlannerOptions {
            output_root: output_root.clone(),
            mode,
            dry_run: options.dry_run,
            rename: options.rename,
        },
    );

    let progress = (!options.dry_run)
        .then(|| OutputFormatter::create_progress_bar(scan.entries.len() as u64));

    for entry in &scan.entries {
        let shown_source = display_relative(&entry.path, &source_root);

        let decision = match planner.plan(entry) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(path = %entry.path.display(), error = %e, "planning failed");
                report_line(progress.as_ref(), || {
                    OutputFormatter::error(&format!("{}: {}", shown_source, e))
                });
                report.record_failure(entry.path.clone(), e.to_string());
                advance(progress.as_ref());
                continue;
            }
        };

        report.record_planned(&decision);
        let shown_destination = display_relative(&decision.destination(), &output_root);

        match decision.action {
            ActionKind::Preview => {
                OutputFormatter::dry_run_notice(&format!(
                    "Would {} {} → {}",
                    mode, shown_source, shown_destination
                ));
            }
            ActionKind::Skip => {
                report_line(progress.as_ref(), || {
                    OutputFormatter::plain(&format!(
                        "  {} already in {}/, skipping",
                        shown_source, decision.category
                    ))
                });
            }
            ActionKind::Copy | ActionKind::Move => {
                execute_decision(
                    &decision,
                    &shown_source,
                    &shown_destination,
                    &mut report,
                    progress.as_ref(),
                );
            }
        }

        advance(progress.as_ref());
    }

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    OutputFormatter::summary(&report, options.dry_run);
    if options.dry_run {
        OutputFormatter::dry_run_notice("No files were modified. Re-run without --dry-run to apply.");
    } else if !report.is_complete_success() {
        OutputFormatter::warning("Some files could not be sorted. Please review errors above.");
    }

    Ok(report)
}

fn execute_decision(
    decision: &PlacementDecision,
    shown_source: &str,
    shown_destination: &str,
    report: &mut RunReport,
    progress: Option<&indicatif::ProgressBar>,
) {
    match FileOrganizer::execute(decision) {
        Ok(()) => {
            report.record_success();
            report_line(progress, || {
                OutputFormatter::success(&format!("{} → {}", shown_source, shown_destination))
            });
        }
        Err(e) => {
            tracing::warn!(path = %decision.source.display(), error = %e, "placement failed");
            report_line(progress, || {
                OutputFormatter::error(&format!("{}: {}", shown_source, e))
            });
            report.record_failure(decision.source.clone(), e.to_string());
        }
    }
}

fn print_banner(
    options: &OrganizeOptions,
    source_root: &Path,
    output_root: &Path,
    mode: TransferMode,
    rules: &RulesSource,
) {
    let title = if options.dry_run {
        format!("DRY RUN: Sorting contents of {}", source_root.display())
    } else {
        format!("Sorting contents of {}", source_root.display())
    };
    OutputFormatter::header(&title);

    if output_root == source_root {
        OutputFormatter::info(&format!("Mode: in-place {}", mode));
    } else {
        OutputFormatter::info(&format!("Mode: {} to {}", mode, output_root.display()));
    }
    match rules {
        RulesSource::File(path) => OutputFormatter::info(&format!("Rules: {}", path.display())),
        RulesSource::Builtin => OutputFormatter::info("Rules: built-in defaults"),
    }
}

/// Prints without tearing the progress bar, if one is active.
fn report_line(progress: Option<&indicatif::ProgressBar>, print: impl FnOnce()) {
    match progress {
        Some(pb) => pb.suspend(print),
        None => print(),
    }
}

fn advance(progress: Option<&indicatif::ProgressBar>) {
    if let Some(pb) = progress {
        pb.inc(1);
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Canonicalizes the source root and checks that it is a directory.
fn resolve_source_root(path: &Path) -> Result<PathBuf, OrganizeError> {
    let canonical = fs::canonicalize(path).map_err(|e| OrganizeError::InvalidBasePath {
        path: path.to_path_buf(),
        source: e,
    })?;

    if !canonical.is_dir() {
        return Err(OrganizeError::InvalidBasePath {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }
    fs::read_dir(&canonical).map_err(|e| OrganizeError::InvalidBasePath {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(canonical)
}

/// Resolves the output root without creating it, so dry runs leave no trace.
fn resolve_output_root(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["sortdir", "/tmp/inbox"]).unwrap();
        let options = cli.to_options();

        assert_eq!(options.source, PathBuf::from("/tmp/inbox"));
        assert!(options.rules.is_none());
        assert!(options.output.is_none());
        assert!(!options.dry_run);
        assert!(!options.rename);
        assert_eq!(options.mode, None);
    }

    #[test]
    fn test_cli_all_flags() {
        let cli = Cli::try_parse_from([
            "sortdir",
            "/tmp/inbox",
            "--rules",
            "rules.json",
            "--output",
            "/tmp/sorted",
            "--dry-run",
            "--rename",
            "--move",
        ])
        .unwrap();
        let options = cli.to_options();

        assert_eq!(options.rules, Some(PathBuf::from("rules.json")));
        assert_eq!(options.output, Some(PathBuf::from("/tmp/sorted")));
        assert!(options.dry_run);
        assert!(options.rename);
        assert_eq!(options.mode, Some(TransferMode::Move));
    }

    #[test]
    fn test_cli_copy_and_move_conflict() {
        let result = Cli::try_parse_from(["sortdir", "/tmp/inbox", "--copy", "--move"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_source() {
        assert!(Cli::try_parse_from(["sortdir"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Ok(RunReport::new())), EXIT_SUCCESS);

        let mut failed = RunReport::new();
        failed.record_failure(PathBuf::from("/x"), "denied");
        assert_eq!(exit_code(&Ok(failed)), EXIT_FILE_FAILURES);

        let fatal = Err(RunError::Config(ConfigError::ConfigInvalid("bad".to_string())));
        assert_eq!(exit_code(&fatal), EXIT_FATAL);
    }

    #[test]
    fn test_display_relative() {
        assert_eq!(
            display_relative(Path::new("/a/b/c.txt"), Path::new("/a")),
            PathBuf::from("b/c.txt").display().to_string()
        );
        assert_eq!(
            display_relative(Path::new("/x/c.txt"), Path::new("/a")),
            "/x/c.txt"
        );
    }
}
