/// Reverting the last run recorded in a destination root.
///
/// Moves are replayed backwards from the journal. Secondary copies are not
/// touched; they are independent files once written.
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::file_organizer::{HistoryError, Operation, OperationLog, move_path};

/// What an undo did.
#[derive(Debug, Default)]
pub struct UndoReport {
    pub restored_files: usize,
    /// Files that could not be put back, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Moved files no longer found where the run put them.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Files that were occupying an original path, and where they went.
    pub backups: Vec<(PathBuf, PathBuf)>,
    /// Whether the journal was removed.
    pub journal_deleted: bool,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

enum RestoreFailure {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

pub struct UndoManager;

impl UndoManager {
    /// Undoes the run journaled in `destination`.
    ///
    /// The journal is deleted only when every move was restored. Otherwise
    /// it is rewritten to hold just the moves still outstanding, so a
    /// partial undo can be retried after fixing whatever blocked it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use datedir::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// let report = UndoManager::undo(Path::new("/srv/sorted"))?;
    /// println!("Restored {} files", report.restored_files);
    /// # Ok::<(), datedir::file_organizer::HistoryError>(())
    /// ```
    pub fn undo(destination: &Path) -> Result<UndoReport, HistoryError> {
        if !destination.is_dir() {
            return Err(HistoryError::InvalidRoot(destination.to_path_buf()));
        }

        let mut log = OperationLog::load(destination)?
            .ok_or_else(|| HistoryError::NothingToUndo(destination.to_path_buf()))?;
        tracing::info!(
            destination = %destination.display(),
            operations = log.operations.len(),
            run = %log.timestamp,
            "undoing run"
        );

        let mut report = UndoReport::default();
        let mut restored = vec![false; log.operations.len()];
        for (index, operation) in log.operations.iter().enumerate().rev() {
            match Self::restore_file(operation) {
                Ok(backup) => {
                    restored[index] = true;
                    report.restored_files += 1;
                    if let Some(backup) = backup {
                        report.backups.push((operation.original_path.clone(), backup));
                    }
                }
                Err(RestoreFailure::Missing(path, reason)) => {
                    report.skipped_files.push((path, reason));
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    tracing::warn!(path = %path.display(), "{}", reason);
                    report.failed_restores.push((path, reason));
                }
            }
        }

        if report.is_complete_success() {
            OperationLog::delete(destination)?;
            report.journal_deleted = true;
        } else if report.restored_files > 0 {
            let mut restored = restored.into_iter();
            log.operations.retain(|_| !restored.next().unwrap_or(false));
            log.destination = destination.to_path_buf();
            log.save()?;
            tracing::info!(
                remaining = log.operations.len(),
                "journal rewritten with outstanding moves"
            );
        }

        Ok(report)
    }

    /// Moves one file back. Returns the backup path when something had to
    /// be moved out of the way first.
    fn restore_file(operation: &Operation) -> Result<Option<PathBuf>, RestoreFailure> {
        if fs::symlink_metadata(&operation.new_path).is_err() {
            return Err(RestoreFailure::Missing(
                operation.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        if let Some(parent) = operation.original_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RestoreFailure::Failed(
                    parent.to_path_buf(),
                    format!("Could not recreate directory: {}", e),
                )
            })?;
        }

        let mut backup = None;
        if fs::symlink_metadata(&operation.original_path).is_ok() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                RestoreFailure::Failed(
                    operation.original_path.clone(),
                    format!("Could not backup conflicting file: {}", e),
                )
            })?;
            backup = Some(backup_path);
        }

        move_path(&operation.new_path, &operation.original_path).map_err(|e| {
            RestoreFailure::Failed(
                operation.new_path.clone(),
                format!("Could not restore file: {}", e),
            )
        })?;

        Ok(backup)
    }

    /// `{name}.bak.{YYYYmmdd-HHMMSS}` next to `path`, counting up if taken.
    fn generate_backup_path(path: &Path) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut candidate = path.with_file_name(format!("{file_name}.bak.{timestamp}"));
        let mut counter = 1;
        while fs::symlink_metadata(&candidate).is_ok() {
            candidate = path.with_file_name(format!("{file_name}.bak.{timestamp}-{counter}"));
            counter += 1;
        }
        candidate
    }
}
