//! Settings loaded from TOML.
//!
//! Settings decide which categories use timestamp naming, where the category
//! mapping store lives, which files are left alone entirely, and how emptied
//! directories are disposed of.
//!
//! # Configuration File Format
//!
//! ```toml
//! [naming]
//! timestamp_categories = ["photos", "videos"]
//!
//! [mappings]
//! path = "/home/me/.config/datedir/extensions.json"
//! ignore_label = "ignore"
//!
//! [filters]
//! skip_hidden = false
//! exclude_filenames = [".DS_Store", "Thumbs.db"]
//! exclude_patterns = ["**/.git/**"]
//! exclude_regex = []
//!
//! [disposal]
//! method = "trash"
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory settings file.
pub const LOCAL_CONFIG_FILE: &str = ".datedirrc.toml";

/// Errors that can occur while loading or compiling settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub naming: NamingSettings,
    #[serde(default)]
    pub mappings: MappingSettings,
    #[serde(default)]
    pub filters: FilterRules,
    #[serde(default)]
    pub disposal: DisposalSettings,
}

/// Which categories get a full timestamp for a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingSettings {
    #[serde(default = "default_timestamp_categories")]
    pub timestamp_categories: BTreeSet<String>,
}

fn default_timestamp_categories() -> BTreeSet<String> {
    ["photos", "videos"].into_iter().map(String::from).collect()
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            timestamp_categories: default_timestamp_categories(),
        }
    }
}

/// Location of the category mapping store and its ignore label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSettings {
    /// Mapping store path. `None` means `~/.config/datedir/extensions.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Category label marking extensions that must never be relocated.
    #[serde(default = "default_ignore_label")]
    pub ignore_label: String,
}

fn default_ignore_label() -> String {
    "ignore".to_string()
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            path: None,
            ignore_label: default_ignore_label(),
        }
    }
}

impl MappingSettings {
    /// The mapping store path, falling back to the per-user location.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        user_config_dir()
            .map(|dir| dir.join("extensions.json"))
            .unwrap_or_else(|| PathBuf::from("extensions.json"))
    }
}

/// Files matching these rules are skipped and left at the origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Skip names starting with ".".
    #[serde(default)]
    pub skip_hidden: bool,

    /// Exact file names to skip.
    #[serde(default)]
    pub exclude_filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the origin.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Regexes matched against the file name.
    #[serde(default)]
    pub exclude_regex: Vec<String>,
}

/// How visited directories are disposed of once the files are out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisposalMethod {
    /// Send to the platform trash / recycle bin.
    #[default]
    Trash,
    /// Delete with `remove_dir`.
    Remove,
    /// Leave directories in place.
    Keep,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisposalSettings {
    #[serde(default)]
    pub method: DisposalMethod,
}

fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("datedir"))
}

impl Settings {
    /// Load settings, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, when given
    /// 2. `.datedirrc.toml` in the current directory
    /// 3. `~/.config/datedir/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or named) but cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(dir) = user_config_dir() {
            let home_config = dir.join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let settings: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Compile the filter rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter rules.
#[derive(Debug)]
pub struct CompiledFilters {
    skip_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .exclude_regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden: rules.skip_hidden,
            exclude_filenames: rules.exclude_filenames.iter().cloned().collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// True when `relative_path` (relative to the origin) should be processed.
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.skip_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
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
