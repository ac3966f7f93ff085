//! Outcome of one batch.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::file_organizer::Operation;

/// Which stage a recoverable failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    File,
    Copy,
    Directory,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::File => "File errors",
            ErrorKind::Copy => "Copy errors",
            ErrorKind::Directory => "Directory errors",
        };
        f.write_str(label)
    }
}

/// A move computed during a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
    pub category: String,
    pub copy_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub dry_run: bool,
    /// Files collected from the origin, filtered ones included.
    pub files_found: usize,
    /// Files skipped by the configured filters.
    pub filtered: usize,
    pub moved: Vec<Operation>,
    pub planned: Vec<PlannedMove>,
    pub disposed: Vec<PathBuf>,
    pub category_counts: BTreeMap<String, usize>,
    /// Extensions assigned a category during this batch.
    pub extensions_assigned: usize,
    /// Problems that did not concern a single file, such as a journal that
    /// could not be written.
    pub warnings: Vec<String>,
    errors: BTreeMap<ErrorKind, Vec<(PathBuf, String)>>,
}

impl BatchReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn record_error(&mut self, kind: ErrorKind, path: &Path, reason: impl ToString) {
        self.errors
            .entry(kind)
            .or_default()
            .push((path.to_path_buf(), reason.to_string()));
    }

    pub fn count_category(&mut self, category: &str) {
        *self.category_counts.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn errors(&self, kind: ErrorKind) -> &[(PathBuf, String)] {
        self.errors.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Non-empty error groups, in `File`, `Copy`, `Directory` order.
    pub fn error_groups(&self) -> impl Iterator<Item = (ErrorKind, &[(PathBuf, String)])> {
        self.errors
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(kind, entries)| (*kind, entries.as_slice()))
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Files moved, or planned to be moved in a dry run.
    pub fn relocated(&self) -> usize {
        if self.dry_run {
            self.planned.len()
        } else {
            self.moved.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_grouped_by_kind() {
        let mut report = BatchReport::new(false);
        report.record_error(ErrorKind::Directory, Path::new("in/sub"), "Directory not empty");
        report.record_error(ErrorKind::File, Path::new("in/a.xyz"), "Extension invalid");
        report.record_error(ErrorKind::File, Path::new("in/README"), "No extension found");

        assert_eq!(report.error_count(), 3);
        assert_eq!(report.errors(ErrorKind::File).len(), 2);
        assert!(report.errors(ErrorKind::Copy).is_empty());

        let kinds: Vec<_> = report.error_groups().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![ErrorKind::File, ErrorKind::Directory]);
    }

    #[test]
    fn test_relocated_follows_mode() {
        let mut report = BatchReport::new(true);
        report.planned.push(PlannedMove {
            from: PathBuf::from("in/a.jpg"),
            to: PathBuf::from("out/2021/photos/a.jpg"),
            category: "photos".to_string(),
            copy_dir: None,
        });
        assert_eq!(report.relocated(), 1);
        assert!(!report.has_errors());
    }
}
