//! Source directory enumeration.
//!
//! Walks the source tree in a stable, name-sorted order and yields the regular
//! files that pass the configured filters. The whole list is collected before
//! any file is placed, so files moved into category folders under the source
//! root are never picked up a second time.

use crate::config::CompiledFilters;
use crate::planner::FileEntry;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files found by a scan, plus entries that could not be read.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<FileEntry>,
    pub errors: Vec<(PathBuf, String)>,
}

/// Recursively lists the files under `source_root`.
///
/// Symlinks are not followed and are not listed. `exclude_root`, when it lies
/// inside the source tree, is skipped entirely; this keeps a separate output
/// folder nested in the source from being fed back into the run.
pub fn scan_directory(
    source_root: &Path,
    exclude_root: Option<&Path>,
    filters: &CompiledFilters,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    let walker = WalkDir::new(source_root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            if exclude_root.is_some_and(|excluded| entry.path() == excluded) {
                return false;
            }
            filters.descend_into(&entry.file_name().to_string_lossy())
        });

    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| source_root.to_path_buf());
                tracing::warn!(path = %path.display(), error = %e, "cannot read entry");
                outcome.errors.push((path, e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(source_root).unwrap_or(entry.path());
        if !filters.should_include(relative) {
            tracing::debug!(path = %relative.display(), "excluded by filters");
            continue;
        }

        let path = entry.into_path();
        match FileEntry::from_path(path.clone()) {
            Some(file) => outcome.entries.push(file),
            None => outcome
                .errors
                .push((path, "file name is not valid UTF-8".to_string())),
        }
    }

    outcome
}
