//! Extension to category classification.
//!
//! Categories are plain labels taken from the mapping store (e.g. "photos",
//! "documents"), so the set is defined by configuration rather than code.
//! The store is persisted as JSON, category → extensions:
//!
//! ```json
//! {
//!     "photos": [".jpeg", ".jpg"],
//!     "ignore": [".tmp"]
//! }
//! ```
//!
//! # Examples
//!
//! ```
//! use datedir::file_category::{CategoryTable, ExtensionRegistry, Lookup};
//!
//! let registry = ExtensionRegistry::new(CategoryTable::default(), "ignore");
//! assert!(matches!(registry.lookup(".JPG"), Lookup::Mapped(c) if c.label() == "photos"));
//! assert!(matches!(registry.lookup(".xyz"), Lookup::Unknown));
//! ```
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::FileError;

/// A destination bucket, e.g. `photos`. Also the directory name under each year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The label, which doubles as the directory name.
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reading or writing the mapping store.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read mapping store {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid mapping store {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write mapping store {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extension {extension} is listed under both '{first}' and '{second}'")]
    Conflict {
        extension: String,
        first: String,
        second: String,
    },

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),
}

/// Normalizes an extension to lower case with a leading dot.
///
/// ```
/// assert_eq!(datedir::file_category::normalize_extension("JPG"), ".jpg");
/// assert_eq!(datedir::file_category::normalize_extension(".Mp4"), ".mp4");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// The persisted category → extensions table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTable {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl CategoryTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Loads the table from `path`, or the built-in table when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "mapping store not found, using built-in table");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Loads the table from `path`.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&json).map_err(|source| RegistryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut table = Self::empty();
        for (category, extensions) in raw {
            table.add_category(&category);
            for ext in extensions {
                table.insert(&category, &ext);
            }
        }
        Ok(table)
    }

    /// Writes the table as pretty JSON with sorted extension lists.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let write_err = |source: std::io::Error| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| RegistryError::Write {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(path, json).map_err(write_err)
    }

    /// Registers a category with no extensions yet.
    pub fn add_category(&mut self, category: &str) {
        self.categories.entry(category.to_string()).or_default();
    }

    /// Adds an extension under a category, creating the category if needed.
    pub fn insert(&mut self, category: &str, ext: &str) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(normalize_extension(ext));
    }

    /// Category labels in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// (extension, category) pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().flat_map(|(category, exts)| {
            exts.iter().map(move |ext| (ext.as_str(), category.as_str()))
        })
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        let mut table = Self::empty();

        for ext in [
            "jpg", "jpeg", "png", "gif", "heic", "heif", "bmp", "tif", "tiff", "webp", "dng",
            "cr2", "nef", "arw", "raw",
        ] {
            table.insert("photos", ext);
        }

        for ext in [
            "mp4", "mov", "avi", "mkv", "m4v", "3gp", "wmv", "mts", "m2ts", "webm",
        ] {
            table.insert("videos", ext);
        }

        for ext in [
            "pdf", "txt", "md", "doc", "docx", "odt", "rtf", "xls", "xlsx", "ods", "csv", "ppt",
            "pptx", "odp", "pages", "numbers", "key",
        ] {
            table.insert("documents", ext);
        }

        for ext in ["mp3", "m4a", "wav", "aac", "flac", "ogg", "opus", "amr", "wma"] {
            table.insert("recordings", ext);
        }

        for ext in ["tmp", "part", "crdownload", "ini", "db", "lnk"] {
            table.insert("ignore", ext);
        }

        table
    }
}

/// Result of an extension lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Mapped to a relocatable category.
    Mapped(Category),
    /// Mapped to the ignore label.
    Ignored,
    /// Not present in the table.
    Unknown,
}

/// Extension → category lookups over a [`CategoryTable`].
///
/// Loaded once per batch and passed in explicitly. Assignments made while
/// resolving unknown extensions mark the registry dirty so the caller can
/// write the table back once at the end.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    table: CategoryTable,
    by_extension: HashMap<String, String>,
    ignore_label: String,
    dirty: bool,
}

impl ExtensionRegistry {
    /// Builds the lookup index. When an extension appears under two
    /// categories, the first in label order wins.
    pub fn new(mut table: CategoryTable, ignore_label: impl Into<String>) -> Self {
        let ignore_label = ignore_label.into();
        table.add_category(&ignore_label);

        let mut by_extension = HashMap::new();
        for (ext, category) in table.entries() {
            by_extension
                .entry(ext.to_string())
                .or_insert_with(|| category.to_string());
        }

        Self {
            table,
            by_extension,
            ignore_label,
            dirty: false,
        }
    }

    /// Like [`ExtensionRegistry::new`], but rejects extensions listed twice.
    pub fn strict(table: CategoryTable, ignore_label: impl Into<String>) -> Result<Self, RegistryError> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (ext, category) in table.entries() {
            if let Some(first) = seen.insert(ext, category) {
                return Err(RegistryError::Conflict {
                    extension: ext.to_string(),
                    first: first.to_string(),
                    second: category.to_string(),
                });
            }
        }
        Ok(Self::new(table, ignore_label))
    }

    /// Looks up an extension, case-insensitively.
    pub fn lookup(&self, ext: &str) -> Lookup {
        match self.by_extension.get(&normalize_extension(ext)) {
            Some(category) if *category == self.ignore_label => Lookup::Ignored,
            Some(category) => Lookup::Mapped(Category::new(category.clone())),
            None => Lookup::Unknown,
        }
    }

    /// True when the extension has any entry, ignore included.
    pub fn is_known(&self, ext: &str) -> bool {
        self.by_extension.contains_key(&normalize_extension(ext))
    }

    /// Classifies an extension, rejecting unknown and ignored ones.
    pub fn classify(&self, ext: &str) -> Result<Category, FileError> {
        match self.lookup(ext) {
            Lookup::Mapped(category) => Ok(category),
            Lookup::Ignored | Lookup::Unknown => Err(FileError::InvalidExtension {
                extension: normalize_extension(ext),
            }),
        }
    }

    /// Maps `ext` to an existing category (or the ignore label).
    ///
    /// # Errors
    ///
    /// Returns `UnknownCategory` if the label is not in the table.
    pub fn assign(&mut self, ext: &str, category: &str) -> Result<(), RegistryError> {
        if !self.table.contains_category(category) {
            return Err(RegistryError::UnknownCategory(category.to_string()));
        }
        let ext = normalize_extension(ext);
        self.table.insert(category, &ext);
        self.by_extension.insert(ext, category.to_string());
        self.dirty = true;
        Ok(())
    }

    /// All labels, ignore label included, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.table.categories().map(String::from).collect()
    }

    pub fn ignore_label(&self) -> &str {
        &self.ignore_label
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// True after an [`ExtensionRegistry::assign`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the table back if it changed. Returns whether it wrote.
    pub fn save_if_dirty(&mut self, path: &Path) -> Result<bool, RegistryError> {
        if !self.dirty {
            return Ok(false);
        }
        self.table.save(path)?;
        self.dirty = false;
        tracing::info!(path = %path.display(), "saved updated extension mappings");
        Ok(true)
    }
}
