//! Rules document loading and file filtering.
//!
//! A rules document maps category names to extension lists and may carry
//! file filters. TOML is the default format; files ending in `.json` are
//! read as JSON. Both formats share one validation path, and document order
//! is preserved so that duplicate policies can talk about "earlier" and
//! "later" assignments.
//!
//! # Configuration File Format
//!
//! ```toml
//! unknown_folder = "Other"
//! on_duplicate = "last-wins"
//!
//! [folders]
//! Images = [".jpg", ".png"]
//! Docs = ["txt", "md"]
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```
//!
//! Without a `folders` table, every top-level key that is not one of
//! `unknown_folder`, `on_duplicate` or `filters` is read as a category.

use crate::rule_table::{DuplicatePolicy, RuleTable};
use glob::Pattern;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory rules file looked up when `--rules` is not given.
pub const LOCAL_RULES_FILE: &str = ".sortdirrc.toml";

/// Errors that make a run impossible before any file is touched.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Rules file not found at the specified path.
    #[error("Rules file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Syntax error or a document that is not a mapping of categories to extension lists.
    #[error("Invalid rules: {0}")]
    ConfigInvalid(String),
    /// An extension claimed by two categories under `on_duplicate = "error"`.
    #[error("Extension '{extension}' is assigned to both '{first}' and '{second}'")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading the rules file.
    #[error("IO error reading rules file: {0}")]
    IoError(String),
}

/// On-disk format of a rules document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesFormat {
    Toml,
    Json,
}

impl RulesFormat {
    /// Picks the format from the file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RulesFormat::Json,
            _ => RulesFormat::Toml,
        }
    }
}

/// One category and the raw extensions assigned to it, as written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: String,
    pub extensions: Vec<String>,
}

/// A parsed but not yet compiled rules document.
#[derive(Debug, Clone, Default)]
pub struct RulesDocument {
    /// Categories in document order.
    pub folders: Vec<CategoryRule>,
    /// Fallback category; "Other" when absent.
    pub unknown_folder: Option<String>,
    pub on_duplicate: DuplicatePolicy,
    pub filters: FilterRules,
}

impl RulesDocument {
    /// Loads and validates a rules document from a file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file does not exist,
    /// `ConfigError::IoError` if it cannot be read and
    /// `ConfigError::ConfigInvalid` if it does not parse or has the wrong shape.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::parse(&content, RulesFormat::from_path(path))
    }

    /// Parses a rules document from text.
    pub fn parse(content: &str, format: RulesFormat) -> Result<Self, ConfigError> {
        let value = match format {
            RulesFormat::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?,
            RulesFormat::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
                serde_json::to_value(table)
                    .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?
            }
        };

        Self::from_value(value)
    }

    /// Validates the shape of an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(root) = value else {
            return Err(ConfigError::ConfigInvalid(
                "expected a mapping of category names to extension lists".to_string(),
            ));
        };

        let mut document = RulesDocument::default();
        let mut folders = None;
        let mut loose = Vec::new();

        for (key, value) in root {
            match key.as_str() {
                "unknown_folder" => match value {
                    Value::String(name) => document.unknown_folder = Some(name),
                    _ => {
                        return Err(ConfigError::ConfigInvalid(
                            "'unknown_folder' must be a string".to_string(),
                        ));
                    }
                },
                "on_duplicate" => {
                    document.on_duplicate = serde_json::from_value(value).map_err(|_| {
                        ConfigError::ConfigInvalid(
                            "'on_duplicate' must be one of \"last-wins\", \"first-wins\", \"error\""
                                .to_string(),
                        )
                    })?;
                }
                "filters" => {
                    document.filters = serde_json::from_value(value)
                        .map_err(|e| ConfigError::ConfigInvalid(format!("filters: {}", e)))?;
                }
                "folders" => match value {
                    Value::Object(map) => folders = Some(parse_categories(map)?),
                    _ => {
                        return Err(ConfigError::ConfigInvalid(
                            "'folders' must be a mapping of category names to extension lists"
                                .to_string(),
                        ));
                    }
                },
                _ => loose.push((key, value)),
            }
        }

        document.folders = match folders {
            Some(folders) => {
                for (key, _) in &loose {
                    tracing::warn!(key = %key, "ignoring unknown top-level key in rules file");
                }
                folders
            }
            None => parse_categories(loose)?,
        };

        Ok(document)
    }
}

fn parse_categories(
    entries: impl IntoIterator<Item = (String, Value)>,
) -> Result<Vec<CategoryRule>, ConfigError> {
    entries
        .into_iter()
        .map(|(name, value)| {
            let Value::Array(items) = value else {
                return Err(ConfigError::ConfigInvalid(format!(
                    "category '{}' must be a list of extensions",
                    name
                )));
            };
            let extensions = items
                .into_iter()
                .map(|item| match item {
                    Value::String(ext) => Ok(ext),
                    other => Err(ConfigError::ConfigInvalid(format!(
                        "category '{}' contains a non-string extension: {}",
                        name, other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CategoryRule { name, extensions })
        })
        .collect()
}

/// Identifies where the active rules came from, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    File(PathBuf),
    Builtin,
}

/// Compiled rules ready for a run.
#[derive(Debug)]
pub struct LoadedRules {
    pub table: RuleTable,
    pub filters: CompiledFilters,
    pub source: RulesSource,
}

/// Loads the rules for a run.
///
/// Attempts to load rules in the following order:
/// 1. If `rules_path` is provided, load from that file
/// 2. Look for `.sortdirrc.toml` in the current directory
/// 3. Look for `~/.config/sortdir/rules.toml` in the home directory
/// 4. Fall back to the built-in rule table with default filters
///
/// # Errors
///
/// Any failure to read, parse, validate or compile a chosen rules file.
pub fn load_rules(rules_path: Option<&Path>) -> Result<LoadedRules, ConfigError> {
    let chosen = match rules_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let home = std::env::var_os("HOME").map(PathBuf::from);
            discover_rules_file(&cwd, home.as_deref())
        }
    };

    match chosen {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading rules file");
            let document = RulesDocument::load_from_file(&path)?;
            let table = RuleTable::build(&document)?;
            let filters = CompiledFilters::new(document.filters)?;
            Ok(LoadedRules {
                table,
                filters,
                source: RulesSource::File(path),
            })
        }
        None => {
            tracing::debug!("no rules file found, using built-in rules");
            Ok(LoadedRules {
                table: RuleTable::builtin(),
                filters: CompiledFilters::new(FilterRules::default())?,
                source: RulesSource::Builtin,
            })
        }
    }
}

/// Finds an implicit rules file, checking the working directory before the home directory.
pub fn discover_rules_file(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let local = cwd.join(LOCAL_RULES_FILE);
    if local.is_file() {
        return Some(local);
    }

    let home_rules = home?.join(".config").join("sortdir").join("rules.toml");
    home_rules.is_file().then_some(home_rules)
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files and directories (starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the source root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Pre-compiled filters, so patterns are parsed once per run rather than per file.
#[derive(Debug)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Whether hidden directories should be descended into at all.
    pub fn descend_into(&self, dir_name: &str) -> bool {
        self.enable_hidden_files || !dir_name.starts_with('.')
    }

    /// Check if a file should be sorted, given its path relative to the source root.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = relative_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filters(rules: FilterRules) -> CompiledFilters {
        CompiledFilters::new(rules).unwrap()
    }

    #[test]
    fn test_parse_toml_folders_table() {
        let doc = RulesDocument::parse(
            r#"
            unknown_folder = "Misc"

            [folders]
            Images = [".jpg", "PNG"]
            Docs = [".txt"]
            "#,
            RulesFormat::Toml,
        )
        .unwrap();

        assert_eq!(doc.unknown_folder.as_deref(), Some("Misc"));
        assert_eq!(doc.folders.len(), 2);
        assert_eq!(doc.folders[0].name, "Images");
        assert_eq!(doc.folders[0].extensions, vec![".jpg", "PNG"]);
        assert_eq!(doc.folders[1].name, "Docs");
    }

    #[test]
    fn test_parse_json_top_level_mapping() {
        let doc = RulesDocument::parse(
            r#"{"Images": [".jpg", ".png"], "Docs": [".txt"]}"#,
            RulesFormat::Json,
        )
        .unwrap();

        let names: Vec<_> = doc.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Images", "Docs"]);
        assert_eq!(doc.on_duplicate, DuplicatePolicy::LastWins);
    }

    #[test]
    fn test_parse_preserves_document_order() {
        let doc = RulesDocument::parse(
            r#"{"folders": {"Zeta": ["z"], "Alpha": ["a"], "Mid": ["m"]}}"#,
            RulesFormat::Json,
        )
        .unwrap();

        let names: Vec<_> = doc.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_parse_duplicate_policy() {
        let doc = RulesDocument::parse(
            "on_duplicate = \"first-wins\"\n[folders]\nA = [\"x\"]\n",
            RulesFormat::Toml,
        )
        .unwrap();
        assert_eq!(doc.on_duplicate, DuplicatePolicy::FirstWins);

        let bad = RulesDocument::parse("on_duplicate = \"sometimes\"\n", RulesFormat::Toml);
        assert!(matches!(bad, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        let cases = [
            (r#"["Images", ".jpg"]"#, RulesFormat::Json),
            (r#"{"Images": ".jpg"}"#, RulesFormat::Json),
            (r#"{"Images": [1, 2]}"#, RulesFormat::Json),
            (r#"{"folders": [".jpg"]}"#, RulesFormat::Json),
            (r#"{"unknown_folder": 3}"#, RulesFormat::Json),
            ("Images = \"jpg\"", RulesFormat::Toml),
            ("this is not toml", RulesFormat::Toml),
        ];

        for (content, format) in cases {
            let result = RulesDocument::parse(content, format);
            assert!(
                matches!(result, Err(ConfigError::ConfigInvalid(_))),
                "accepted {:?}",
                content
            );
        }
    }

    #[test]
    fn test_filters_section_is_parsed() {
        let doc = RulesDocument::parse(
            r#"
            [folders]
            Images = ["jpg"]

            [filters]
            enable_hidden_files = true

            [filters.exclude]
            extensions = ["tmp"]
            "#,
            RulesFormat::Toml,
        )
        .unwrap();

        assert!(doc.filters.enable_hidden_files);
        assert_eq!(doc.filters.exclude.extensions, vec!["tmp"]);
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = RulesDocument::load_from_file(Path::new("/no/such/rules.toml"));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_rules_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, r#"{"folders": {"Images": [".jpg"]}}"#).unwrap();

        let loaded = load_rules(Some(&path)).unwrap();
        assert_eq!(loaded.table.lookup("JPG"), "Images");
        assert_eq!(loaded.source, RulesSource::File(path));
    }

    #[test]
    fn test_discover_prefers_local_file() {
        let cwd = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let home_rules = home.path().join(".config").join("sortdir");
        fs::create_dir_all(&home_rules).unwrap();
        fs::write(home_rules.join("rules.toml"), "").unwrap();

        assert_eq!(
            discover_rules_file(cwd.path(), Some(home.path())),
            Some(home_rules.join("rules.toml"))
        );

        fs::write(cwd.path().join(LOCAL_RULES_FILE), "").unwrap();
        assert_eq!(
            discover_rules_file(cwd.path(), Some(home.path())),
            Some(cwd.path().join(LOCAL_RULES_FILE))
        );
    }

    #[test]
    fn test_discover_nothing() {
        let cwd = TempDir::new().unwrap();
        assert_eq!(discover_rules_file(cwd.path(), None), None);
    }

    #[test]
    fn test_hidden_file_excluded_by_default() {
        let compiled = filters(FilterRules::default());

        assert!(!compiled.should_include(Path::new(".DS_Store")));
        assert!(!compiled.should_include(Path::new("sub/.gitignore")));
        assert!(compiled.should_include(Path::new("photo.jpg")));
        assert!(!compiled.descend_into(".git"));
    }

    #[test]
    fn test_hidden_file_included_when_enabled() {
        let compiled = filters(FilterRules {
            enable_hidden_files: true,
            ..Default::default()
        });

        assert!(compiled.should_include(Path::new(".DS_Store")));
        assert!(compiled.descend_into(".git"));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(!compiled.should_include(Path::new("album/Thumbs.db")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                extensions: vec!["bak".to_string(), ".tmp".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("file.bak")));
        assert!(!compiled.should_include(Path::new("file.TMP")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["*.cache".to_string(), "node_modules/**".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("file.cache")));
        assert!(!compiled.should_include(Path::new("node_modules/package.json")));
        assert!(compiled.should_include(Path::new("src/package.json")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = filters(FilterRules {
            include: IncludeRules {
                patterns: vec![".important".to_string()],
            },
            ..Default::default()
        });

        assert!(compiled.should_include(Path::new(".important")));
        assert!(!compiled.should_include(Path::new(".other")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = filters(FilterRules {
            exclude: ExcludeRules {
                regex: vec![r"^draft_.*\.txt$".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        assert!(!compiled.should_include(Path::new("notes/draft_one.txt")));
        assert!(compiled.should_include(Path::new("final.txt")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let regex = CompiledFilters::new(FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[unclosed".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(
            regex,
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let glob = CompiledFilters::new(FilterRules {
            exclude: ExcludeRules {
                patterns: vec!["a/***".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(matches!(glob, Err(ConfigError::InvalidGlobPattern(_))));
    }
}
