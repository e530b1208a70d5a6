/// Placement planning: deciding where each file goes and under which name.
///
/// The planner turns one [`FileEntry`] at a time into a [`PlacementDecision`].
/// It never touches the filesystem itself beyond existence checks made through a
/// [`PathProbe`], which lets dry runs and tests predict exactly the names a real
/// run would pick.
use crate::rule_table::RuleTable;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on ` (n)` suffixes tried before giving up on a file.
pub const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// A discovered file waiting to be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Base name including the extension.
    pub file_name: String,
    /// Final extension with its leading dot, as found on disk; empty if there is none.
    pub extension: String,
}

impl FileEntry {
    /// Builds an entry from a path. Returns `None` when the path has no
    /// UTF-8 file name.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        Some(Self {
            path,
            file_name,
            extension,
        })
    }
}

/// How files reach their category folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Copy => write!(f, "copy"),
            TransferMode::Move => write!(f, "move"),
        }
    }
}

/// What will be done with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Copy,
    Move,
    /// Dry run: the decision is reported but not executed.
    Preview,
    /// Move mode only: the file already sits in its category folder.
    Skip,
}

/// The planner's answer for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDecision {
    pub source: PathBuf,
    pub category: String,
    pub destination_dir: PathBuf,
    pub file_name: String,
    pub action: ActionKind,
}

impl PlacementDecision {
    /// Full destination path.
    pub fn destination(&self) -> PathBuf {
        self.destination_dir.join(&self.file_name)
    }

    /// Whether the destination name differs from the source name.
    pub fn is_renamed(&self) -> bool {
        self.source
            .file_name()
            .is_none_or(|name| name.to_str() != Some(self.file_name.as_str()))
    }
}

/// Errors raised while planning a single file.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(
        "no free name for '{file_name}' in {} after {max} attempts",
        .directory.display(),
        max = MAX_NAME_ATTEMPTS
    )]
    NamesExhausted {
        directory: PathBuf,
        file_name: String,
    },
}

/// Existence check used to detect collisions with files already on disk.
pub trait PathProbe {
    fn exists(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem. Dangling symlinks count as existing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskProbe;

impl PathProbe for DiskProbe {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }
}

/// Run-wide settings for a planner.
#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Root under which category folders are created.
    pub output_root: PathBuf,
    pub mode: TransferMode,
    pub dry_run: bool,
    /// Normalize file names before resolving collisions.
    pub rename: bool,
}

/// Produces placement decisions for one run.
///
/// Every path a decision occupies is remembered for the rest of the run:
/// destinations, and in move mode also the sources the files leave behind.
/// Keeping vacated sources claimed makes a real run (where they disappear)
/// and a dry run (where they stay) agree on every name.
pub struct PlacementPlanner<'a, P: PathProbe = DiskProbe> {
    rules: &'a RuleTable,
    options: PlannerOptions,
    probe: P,
    claimed: HashSet<PathBuf>,
}

impl<'a> PlacementPlanner<'a, DiskProbe> {
    /// Creates a planner that checks collisions against the real filesystem.
    pub fn new(rules: &'a RuleTable, options: PlannerOptions) -> Self {
        Self::with_probe(rules, options, DiskProbe)
    }
}

impl<'a, P: PathProbe> PlacementPlanner<'a, P> {
    pub fn with_probe(rules: &'a RuleTable, options: PlannerOptions, probe: P) -> Self {
        Self {
            rules,
            options,
            probe,
            claimed: HashSet::new(),
        }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Plans the placement of one file.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NamesExhausted` when every suffix up to
    /// [`MAX_NAME_ATTEMPTS`] is taken.
    pub fn plan(&mut self, entry: &FileEntry) -> Result<PlacementDecision, PlanError> {
        let category = self.rules.lookup(&entry.extension).to_string();
        let destination_dir = self.options.output_root.join(&category);

        if self.options.mode == TransferMode::Move
            && entry.path.parent() == Some(destination_dir.as_path())
        {
            tracing::debug!(path = %entry.path.display(), "already organized");
            self.claimed.insert(entry.path.clone());
            return Ok(PlacementDecision {
                source: entry.path.clone(),
                category,
                destination_dir,
                file_name: entry.file_name.clone(),
                action: ActionKind::Skip,
            });
        }

        let wanted = if self.options.rename {
            normalize_file_name(&entry.file_name)
        } else {
            entry.file_name.clone()
        };
        let file_name = self.resolve_name(&destination_dir, &wanted)?;

        self.claimed.insert(destination_dir.join(&file_name));
        if self.options.mode == TransferMode::Move {
            self.claimed.insert(entry.path.clone());
        }

        let action = match (self.options.dry_run, self.options.mode) {
            (true, _) => ActionKind::Preview,
            (false, TransferMode::Copy) => ActionKind::Copy,
            (false, TransferMode::Move) => ActionKind::Move,
        };

        Ok(PlacementDecision {
            source: entry.path.clone(),
            category,
            destination_dir,
            file_name,
            action,
        })
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.claimed.contains(path) || self.probe.exists(path)
    }

    fn resolve_name(&self, directory: &Path, wanted: &str) -> Result<String, PlanError> {
        if !self.is_taken(&directory.join(wanted)) {
            return Ok(wanted.to_string());
        }

        for n in 1..=MAX_NAME_ATTEMPTS {
            let candidate = suffixed_name(wanted, n);
            if !self.is_taken(&directory.join(&candidate)) {
                tracing::debug!(wanted, chosen = %candidate, "name collision resolved");
                return Ok(candidate);
            }
        }

        Err(PlanError::NamesExhausted {
            directory: directory.to_path_buf(),
            file_name: wanted.to_string(),
        })
    }
}

/// Inserts ` (n)` before the final extension: `photo.jpg` becomes `photo (2).jpg`.
///
/// Names without an extension, and dotfiles, get the suffix at the end.
pub fn suffixed_name(file_name: &str, n: u32) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = file_name.split_at(dot);
            format!("{} ({}){}", stem, n, ext)
        }
        _ => format!("{} ({})", file_name, n),
    }
}

/// Normalizes a file name for `--rename`: spaces become underscores, anything
/// outside `[A-Za-z0-9._-]` is dropped and underscore runs collapse.
pub fn normalize_file_name(file_name: &str) -> String {
    let mut normalized = String::with_capacity(file_name.len());
    for c in file_name.trim().chars() {
        match c {
            ' ' | '_' => {
                if !normalized.ends_with('_') {
                    normalized.push('_');
                }
            }
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' => normalized.push(c),
            _ => {}
        }
    }

    if normalized.is_empty() || normalized.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        normalized
    }
}
