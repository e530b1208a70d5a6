/// Carrying out placement decisions on disk.
///
/// This module performs the copy or move a [`PlacementDecision`] describes,
/// creating category directories on first use, and collects per-file outcomes
/// into a [`RunReport`]. A failure here concerns one file only; callers record
/// it and carry on with the next file.
use crate::planner::{ActionKind, PlacementDecision};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while placing files.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to copy a file into its category directory.
    #[error("Failed to copy {} to {}: {error}", .from.display(), .to.display())]
    FileCopyFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    /// Failed to move a file into its category directory.
    #[error("Failed to move {} to {}: {error}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    /// Something appeared at the destination after planning; it is never overwritten.
    #[error("Destination already exists: {}", .path.display())]
    DestinationExists { path: PathBuf },
    /// The source directory path is invalid or doesn't exist.
    #[error("Invalid source directory {}: {source}", .path.display())]
    InvalidBasePath { path: PathBuf, source: io::Error },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Outcome counts for a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Decisions produced by the planner.
    pub planned: usize,
    /// Copies or moves that completed.
    pub succeeded: usize,
    /// Files left alone because they were already organized.
    pub skipped: Vec<PathBuf>,
    /// Files that could not be placed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Decisions per category.
    pub category_counts: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a decision before it is executed.
    pub fn record_planned(&mut self, decision: &PlacementDecision) {
        self.planned += 1;
        *self
            .category_counts
            .entry(decision.category.clone())
            .or_insert(0) += 1;
        if decision.action == ActionKind::Skip {
            self.skipped.push(decision.source.clone());
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failed.push((path, reason.into()));
    }

    /// Returns true if no file failed.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Executes placement decisions.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Carries out a decision. Preview and skip decisions do nothing.
    ///
    /// The destination directory is created if needed. An existing file at the
    /// destination is never overwritten.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortdir::file_organizer::FileOrganizer;
    /// use sortdir::planner::{ActionKind, PlacementDecision};
    /// use std::path::PathBuf;
    ///
    /// let decision = PlacementDecision {
    ///     source: PathBuf::from("/data/inbox/photo.png"),
    ///     category: "Images".to_string(),
    ///     destination_dir: PathBuf::from("/data/inbox/Images"),
    ///     file_name: "photo.png".to_string(),
    ///     action: ActionKind::Move,
    /// };
    ///
    /// match FileOrganizer::execute(&decision) {
    ///     Ok(()) => println!("Moved to {}", decision.destination().display()),
    ///     Err(e) => eprintln!("Placement failed: {}", e),
    /// }
    /// ```
    pub fn execute(decision: &PlacementDecision) -> OrganizeResult<()> {
        match decision.action {
            ActionKind::Preview | ActionKind::Skip => Ok(()),
            ActionKind::Copy => {
                let destination = Self::prepare_destination(decision)?;
                Self::copy_file(&decision.source, &destination)
            }
            ActionKind::Move => {
                let destination = Self::prepare_destination(decision)?;
                Self::move_file(&decision.source, &destination)
            }
        }
    }

    fn prepare_destination(decision: &PlacementDecision) -> OrganizeResult<PathBuf> {
        Self::ensure_directory(&decision.destination_dir)?;

        let destination = decision.destination();
        if destination.symlink_metadata().is_ok() {
            return Err(OrganizeError::DestinationExists { path: destination });
        }
        Ok(destination)
    }

    /// Creates a category directory (and any missing parents) if it does not exist.
    pub fn ensure_directory(path: &Path) -> OrganizeResult<()> {
        if path.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn copy_file(from: &Path, to: &Path) -> OrganizeResult<()> {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| OrganizeError::FileCopyFailure {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                error: e,
            })
    }

    /// Renames the file, falling back to copy and delete across filesystems.
    fn move_file(from: &Path, to: &Path) -> OrganizeResult<()> {
        let move_failure = |e: io::Error| OrganizeError::FileMoveFailure {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e,
        };

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(from = %from.display(), "rename crosses devices, copying instead");
                fs::copy(from, to).map_err(move_failure)?;
                if let Err(e) = fs::remove_file(from) {
                    let _ = fs::remove_file(to);
                    return Err(move_failure(e));
                }
                Ok(())
            }
            Err(e) => Err(move_failure(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn decision(source: &Path, dir: &Path, name: &str, action: ActionKind) -> PlacementDecision {
        PlacementDecision {
            source: source.to_path_buf(),
            category: dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            destination_dir: dir.to_path_buf(),
            file_name: name.to_string(),
            action,
        }
    }

    #[test]
    fn test_move_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let category_dir = base_path.join("Docs");
        FileOrganizer::execute(&decision(&file_path, &category_dir, "test.txt", ActionKind::Move))
            .expect("Failed to move file");

        assert!(category_dir.is_dir());
        assert!(!file_path.exists());
        assert_eq!(
            fs::read_to_string(category_dir.join("test.txt")).unwrap(),
            "test content"
        );
    }

    #[test]
    fn test_copy_keeps_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("photo.jpg");
        fs::write(&file_path, "pixels").expect("Failed to write test file");

        let category_dir = base_path.join("out").join("Images");
        FileOrganizer::execute(&decision(
            &file_path,
            &category_dir,
            "photo (1).jpg",
            ActionKind::Copy,
        ))
        .expect("Failed to copy file");

        assert!(file_path.exists());
        assert!(category_dir.join("photo (1).jpg").exists());
    }

    #[test]
    fn test_preview_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("a.txt");
        fs::write(&file_path, "x").unwrap();
        let category_dir = base_path.join("Docs");

        FileOrganizer::execute(&decision(&file_path, &category_dir, "a.txt", ActionKind::Preview))
            .unwrap();
        FileOrganizer::execute(&decision(&file_path, &category_dir, "a.txt", ActionKind::Skip))
            .unwrap();

        assert!(file_path.exists());
        assert!(!category_dir.exists());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("a.txt");
        fs::write(&file_path, "new").unwrap();
        let category_dir = base_path.join("Docs");
        fs::create_dir(&category_dir).unwrap();
        fs::write(category_dir.join("a.txt"), "old").unwrap();

        let result =
            FileOrganizer::execute(&decision(&file_path, &category_dir, "a.txt", ActionKind::Move));

        assert!(matches!(result, Err(OrganizeError::DestinationExists { .. })));
        assert_eq!(fs::read_to_string(category_dir.join("a.txt")).unwrap(), "old");
        assert!(file_path.exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let result = FileOrganizer::execute(&decision(
            &base_path.join("vanished.txt"),
            &base_path.join("Docs"),
            "vanished.txt",
            ActionKind::Copy,
        ));

        assert!(matches!(result, Err(OrganizeError::FileCopyFailure { .. })));
    }

    #[test]
    fn test_report_counts() {
        let mut report = RunReport::new();
        let skip = decision(
            Path::new("/s/Images/a.jpg"),
            Path::new("/s/Images"),
            "a.jpg",
            ActionKind::Skip,
        );
        let copy = decision(
            Path::new("/s/b.jpg"),
            Path::new("/s/Images"),
            "b.jpg",
            ActionKind::Copy,
        );

        report.record_planned(&skip);
        report.record_planned(&copy);
        report.record_success();

        assert_eq!(report.planned, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, vec![PathBuf::from("/s/Images/a.jpg")]);
        assert_eq!(report.category_counts.get("Images"), Some(&2));
        assert!(report.is_complete_success());

        report.record_failure(PathBuf::from("/s/c.txt"), "permission denied");
        assert!(!report.is_complete_success());
    }
}
