/// Relocation of classified files into the `{year}/{category}` tree.
///
/// This module creates destination directories, moves each file to its
/// collision-free path, places the optional secondary copy, and keeps a
/// journal of every move so a run can be undone.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::{CopyError, FileError};
use crate::file_record::FileRecord;
use crate::unique_path;

/// Name of the journal file written at the destination root.
pub const HISTORY_FILE: &str = ".datedir_history.json";

/// One move performed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Where the file was before the run.
    pub original_path: PathBuf,
    /// Where the file was moved to.
    pub new_path: PathBuf,
    /// Category label the file was filed under.
    pub category: String,
    /// Secondary copy, when one was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_path: Option<PathBuf>,
}

/// Errors reading or writing the journal.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history file: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to read history file: {0}")]
    Read(#[source] io::Error),

    #[error("Invalid history file format: {0}")]
    InvalidFormat(String),

    #[error("No previous run found to undo in {}", .0.display())]
    NothingToUndo(PathBuf),

    #[error("Destination root does not exist: {}", .0.display())]
    InvalidRoot(PathBuf),
}

/// The journal of one run, persisted at the destination root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Source root of the run.
    pub origin: PathBuf,
    /// Destination root of the run.
    pub destination: PathBuf,
    /// Moves in the order they happened.
    pub operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new(origin: PathBuf, destination: PathBuf) -> Self {
        Self {
            timestamp: Utc::now(),
            origin,
            destination,
            operations: Vec::new(),
        }
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn history_file_path(destination: &Path) -> PathBuf {
        destination.join(HISTORY_FILE)
    }

    /// Writes the journal to `{destination}/.datedir_history.json`.
    pub fn save(&self) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            HistoryError::Write(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            ))
        })?;
        fs::write(Self::history_file_path(&self.destination), json).map_err(HistoryError::Write)
    }

    /// Loads the journal of the last run, if any.
    pub fn load(destination: &Path) -> Result<Option<Self>, HistoryError> {
        let history_path = Self::history_file_path(destination);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(HistoryError::Read)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| HistoryError::InvalidFormat(format!("JSON parse error: {}", e)))
    }

    /// Removes the journal file, if present.
    pub fn delete(destination: &Path) -> Result<(), HistoryError> {
        let history_path = Self::history_file_path(destination);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(HistoryError::Write)?;
        }
        Ok(())
    }
}

/// Executes the filesystem side of a [`FileRecord`].
pub struct Relocator;

impl Relocator {
    /// Creates the destination directory and, if configured, the copy
    /// directory. Already existing directories are fine.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreation` for any other failure.
    pub fn prepare(record: &FileRecord) -> Result<(), FileError> {
        let dirs = std::iter::once(record.destination_dir()).chain(record.copy_dir());
        for dir in dirs {
            fs::create_dir_all(dir).map_err(|source| FileError::DirectoryCreation {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Moves the source to its unique destination and returns the final path.
    ///
    /// The unique stem is resolved here, right before the rename. A source
    /// that vanished since enumeration yields `SourceMissing`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use datedir::file_category::{CategoryTable, ExtensionRegistry};
    /// use datedir::file_organizer::Relocator;
    /// use datedir::file_record::{Destinations, FileRecord};
    /// use datedir::name_composer::NameComposer;
    /// use std::path::Path;
    ///
    /// let registry = ExtensionRegistry::new(CategoryTable::default(), "ignore");
    /// let mut record = FileRecord::build(
    ///     Path::new("/inbox/IMG.jpg"),
    ///     &registry,
    ///     &NameComposer::default(),
    ///     &Destinations::new("/out", None),
    /// )?;
    /// Relocator::prepare(&record)?;
    /// let moved = Relocator::move_file(&mut record)?;
    /// println!("{}", moved.display());
    /// # Ok::<(), datedir::error::FileError>(())
    /// ```
    pub fn move_file(record: &mut FileRecord) -> Result<PathBuf, FileError> {
        let source = record.original_path().to_path_buf();
        if fs::symlink_metadata(&source).is_err() {
            return Err(FileError::SourceMissing { path: source });
        }

        let destination = record.resolve_destination();
        move_path(&source, &destination).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound if fs::symlink_metadata(&source).is_err() => {
                FileError::SourceMissing {
                    path: source.clone(),
                }
            }
            _ => FileError::Move {
                from: source.clone(),
                to: destination.clone(),
                source: e,
            },
        })?;

        record.mark_moved(destination.clone());
        Ok(destination)
    }

    /// Copies the moved file into the copy directory and returns the copy path.
    ///
    /// The copy name is made unique within the copy directory on its own.
    ///
    /// # Errors
    ///
    /// `NotMoved` if the record has not been moved yet; I/O errors otherwise.
    pub fn copy_file(record: &FileRecord) -> Result<PathBuf, CopyError> {
        let moved = record.moved_to().ok_or_else(|| CopyError::NotMoved {
            path: record.original_path().to_path_buf(),
        })?;
        let copy_dir = record
            .copy_dir()
            .ok_or_else(|| CopyError::NoCopyDestination {
                path: record.original_path().to_path_buf(),
            })?;

        fs::create_dir_all(copy_dir).map_err(|source| CopyError::DirectoryCreation {
            path: copy_dir.to_path_buf(),
            source,
        })?;

        let stem = record.unique_stem().unwrap_or(record.proposed_stem());
        let unique = unique_path::resolve(copy_dir, stem, record.extension());
        let copy_path = copy_dir.join(format!("{unique}{}", record.extension()));

        fs::copy(moved, &copy_path).map_err(|source| CopyError::Io {
            from: moved.to_path_buf(),
            to: copy_path.clone(),
            source,
        })?;

        Ok(copy_path)
    }
}

/// Renames `from` to `to`, falling back to copy + remove across filesystems.
pub(crate) fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), "cross-device move, copying instead");
            copy_then_remove(from, to)
        }
        other => other,
    }
}

/// Copies `from` to `to` and removes `from`. If the removal fails the copy
/// is deleted again, so exactly one of the two paths holds the file.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    fs::remove_file(from).inspect_err(|_| {
        if let Err(e) = fs::remove_file(to) {
            tracing::warn!(path = %to.display(), "could not remove partial move: {}", e);
        }
    })
}
