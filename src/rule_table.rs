/// Extension-to-category lookup used to decide where each file belongs.
///
/// A `RuleTable` is built once per run, either from a rules document or from
/// the built-in defaults, and is immutable afterwards. Lookups are
/// case-insensitive and tolerate a missing leading dot.
///
/// # Examples
///
/// ```
/// use sortdir::rule_table::RuleTable;
///
/// let table = RuleTable::builtin();
/// assert_eq!(table.lookup(".png"), "Images");
/// assert_eq!(table.lookup("PDF"), "Documents");
/// assert_eq!(table.lookup(".xyz"), "Other");
/// ```
use crate::config::{ConfigError, RulesDocument};
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

/// Category used for extensions that no rule claims.
pub const DEFAULT_CATEGORY: &str = "Other";

/// What to do when a rules document assigns one extension to two categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The category defined later in the document replaces the earlier one.
    #[default]
    LastWins,
    /// The first assignment is kept and later ones are ignored.
    FirstWins,
    /// Conflicting assignments are rejected with `ConfigError::DuplicateExtension`.
    Error,
}

/// Normalizes a raw extension to its lookup key: trimmed, lower-cased, dot-prefixed.
///
/// An empty input stays empty so that it never matches a rule.
///
/// # Examples
///
/// ```
/// use sortdir::rule_table::normalize_extension;
///
/// assert_eq!(normalize_extension("JPG"), ".jpg");
/// assert_eq!(normalize_extension(".Tar"), ".tar");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Immutable mapping from normalized extension to category name.
#[derive(Debug, Clone)]
pub struct RuleTable {
    extension_map: HashMap<String, String>,
    categories: Vec<String>,
    default_category: String,
}

impl RuleTable {
    /// Builds a table from a parsed rules document.
    ///
    /// Extensions are normalized before insertion. Conflicting assignments are
    /// resolved with the document's [`DuplicatePolicy`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigInvalid` for empty extensions or category names
    /// that cannot be used as a single folder name, and
    /// `ConfigError::DuplicateExtension` when the policy is `Error` and an
    /// extension is claimed by two different categories.
    pub fn build(document: &RulesDocument) -> Result<Self, ConfigError> {
        let default_category = document
            .unknown_folder
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        validate_category_name(&default_category)?;

        let mut table = Self::empty(default_category);

        for rule in &document.folders {
            validate_category_name(&rule.name)?;
            table.register_category(&rule.name);

            for raw in &rule.extensions {
                let extension = normalize_extension(raw);
                if extension.len() < 2 {
                    return Err(ConfigError::ConfigInvalid(format!(
                        "category '{}' lists an empty extension",
                        rule.name
                    )));
                }
                table.insert(extension, &rule.name, document.on_duplicate)?;
            }
        }

        let default_category = table.default_category.clone();
        table.register_category(&default_category);

        tracing::debug!(
            extensions = table.extension_map.len(),
            categories = table.categories.len(),
            "rule table built"
        );
        Ok(table)
    }

    /// Returns the built-in table used when no rules file is available.
    pub fn builtin() -> Self {
        let mut table = Self::empty(DEFAULT_CATEGORY.to_string());

        for (category, extensions) in BUILTIN_RULES {
            table.register_category(category);
            for extension in *extensions {
                table.add_extension_mapping(extension, category);
            }
        }

        table.register_category(DEFAULT_CATEGORY);
        table
    }

    fn empty(default_category: String) -> Self {
        Self {
            extension_map: HashMap::new(),
            categories: Vec::new(),
            default_category,
        }
    }

    fn register_category(&mut self, category: &str) {
        if !self.categories.iter().any(|c| c == category) {
            self.categories.push(category.to_string());
        }
    }

    fn insert(
        &mut self,
        extension: String,
        category: &str,
        policy: DuplicatePolicy,
    ) -> Result<(), ConfigError> {
        match self.extension_map.entry(extension) {
            Entry::Vacant(slot) => {
                slot.insert(category.to_string());
            }
            Entry::Occupied(mut slot) => {
                if slot.get() == category {
                    return Ok(());
                }
                match policy {
                    DuplicatePolicy::LastWins => {
                        tracing::debug!(
                            extension = %slot.key(),
                            from = %slot.get(),
                            to = category,
                            "extension reassigned"
                        );
                        slot.insert(category.to_string());
                    }
                    DuplicatePolicy::FirstWins => {
                        tracing::debug!(
                            extension = %slot.key(),
                            kept = %slot.get(),
                            ignored = category,
                            "duplicate extension ignored"
                        );
                    }
                    DuplicatePolicy::Error => {
                        return Err(ConfigError::DuplicateExtension {
                            extension: slot.key().clone(),
                            first: slot.get().clone(),
                            second: category.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Adds or replaces a single extension mapping (built-in table only).
    fn add_extension_mapping(&mut self, extension: &str, category: &str) {
        let extension = normalize_extension(extension);
        if extension.len() > 1 {
            self.register_category(category);
            self.extension_map.insert(extension, category.to_string());
        }
    }

    /// Returns the category for an extension, or the default category.
    ///
    /// The extension may be given with or without its leading dot and in any case.
    pub fn lookup(&self, extension: &str) -> &str {
        self.extension_map
            .get(&normalize_extension(extension))
            .map(String::as_str)
            .unwrap_or(self.default_category.as_str())
    }

    /// Returns the category for a file path based on its final extension.
    pub fn lookup_path(&self, path: &Path) -> &str {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy())
            .unwrap_or_default();
        self.lookup(&extension)
    }

    /// Category assigned to files no rule matches.
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// All category names in declaration order, default category included.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of extension rules.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A category name becomes a folder name, so it must be exactly one path component.
fn validate_category_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::ConfigInvalid(
            "category names must not be empty".to_string(),
        ));
    }
    if trimmed == "." || trimmed == ".." || name.contains(['/', '\\']) {
        return Err(ConfigError::ConfigInvalid(format!(
            "category '{}' is not a valid folder name",
            name
        )));
    }
    Ok(())
}

const BUILTIN_RULES: &[(&str, &[&str])] = &[
    (
        "Images",
        &[
            "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "tiff", "ico", "heic",
        ],
    ),
    ("Audio", &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma"]),
    (
        "Videos",
        &["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "3gp"],
    ),
    (
        "Documents",
        &["pdf", "txt", "doc", "docx", "html", "htm", "md", "rtf", "odt"],
    ),
    ("Archives", &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"]),
    (
        "Code",
        &[
            "py", "java", "c", "cpp", "h", "hpp", "js", "ts", "rs", "go", "sh", "bash", "json",
            "xml", "yaml", "yml", "toml",
        ],
    ),
    ("Spreadsheets", &["csv", "xls", "xlsx", "ods"]),
    ("Presentations", &["ppt", "pptx", "odp"]),
    ("Fonts", &["ttf", "otf", "woff", "woff2"]),
];
