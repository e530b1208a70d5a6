//! sortdir - sort files into category folders by extension
//!
//! This library loads extension-to-category rules, plans a collision-safe
//! destination for every file in a source tree, and copies or moves the files
//! into place. Dry runs produce the same plan without touching the filesystem.

pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod planner;
pub mod rule_table;
pub mod scan;

pub use config::{CompiledFilters, ConfigError, RulesDocument, load_rules};
pub use file_organizer::{FileOrganizer, OrganizeError, RunReport};
pub use planner::{
    ActionKind, FileEntry, PlacementDecision, PlacementPlanner, PlannerOptions, TransferMode,
};
pub use rule_table::{DuplicatePolicy, RuleTable};

pub use cli::{Cli, OrganizeOptions, organize, run_cli};
