//! One organizing run over an origin tree.
//!
//! A batch validates its roots, collects every entry under the origin up
//! front, resolves unknown extensions, then relocates files one at a time.
//! Per-file, per-copy and per-directory failures land in the [`BatchReport`];
//! only precondition failures abort.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{CompiledFilters, Settings};
use crate::disposal::{self, Disposer};
use crate::error::{BatchError, FileError};
use crate::file_category::{CategoryTable, ExtensionRegistry};
use crate::file_organizer::{HISTORY_FILE, Operation, OperationLog, Relocator};
use crate::file_record::{Destinations, FileRecord};
use crate::name_composer::NameComposer;
use crate::report::{BatchReport, ErrorKind, PlannedMove};
use crate::resolver::{self, ExtensionResolver};
use crate::unique_path;

/// Roots and mode of one batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub origin: PathBuf,
    pub destination: PathBuf,
    pub copy_destination: Option<PathBuf>,
    pub dry_run: bool,
}

impl BatchRequest {
    pub fn new(origin: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            copy_destination: None,
            dry_run: false,
        }
    }

    pub fn with_copy_destination(mut self, copy_destination: impl Into<PathBuf>) -> Self {
        self.copy_destination = Some(copy_destination.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// Enumeration finished; `files` will be processed.
    Started { files: usize },
    Moved { from: &'a Path, to: &'a Path },
    Planned { from: &'a Path, to: &'a Path },
    Copied { to: &'a Path },
    Failed { path: &'a Path, reason: &'a str },
    /// One file is done, whatever the outcome.
    Processed,
}

/// Roots after validation, canonicalized.
#[derive(Debug)]
struct Roots {
    origin: PathBuf,
    destination: PathBuf,
    copy_destination: Option<PathBuf>,
}

/// Entries collected from the origin before anything moves.
#[derive(Debug, Default)]
struct Enumeration {
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
    filtered: usize,
}

/// Runs batches with a fixed registry, naming and disposal setup.
pub struct Organizer {
    registry: ExtensionRegistry,
    composer: NameComposer,
    filters: CompiledFilters,
    disposer: Option<Box<dyn Disposer>>,
    mappings_path: Option<PathBuf>,
}

impl Organizer {
    pub fn new(registry: ExtensionRegistry, composer: NameComposer, filters: CompiledFilters) -> Self {
        Self {
            registry,
            composer,
            filters,
            disposer: None,
            mappings_path: None,
        }
    }

    /// Builds an organizer from settings, loading the mapping store from
    /// `settings.mappings` (the built-in table when the store does not exist).
    ///
    /// A store listing one extension under two categories is rejected.
    pub fn from_settings(settings: &Settings) -> Result<Self, BatchError> {
        let mappings_path = settings.mappings.resolved_path();
        let table = CategoryTable::load_or_default(&mappings_path)?;
        let registry = ExtensionRegistry::strict(table, settings.mappings.ignore_label.clone())?;
        let composer = NameComposer::new(settings.naming.timestamp_categories.iter().cloned());
        let filters = settings.compile_filters()?;

        Ok(Self::new(registry, composer, filters)
            .with_disposer(disposal::for_method(settings.disposal.method))
            .with_mappings_path(mappings_path))
    }

    /// Sets how visited directories are disposed of; `None` keeps them.
    pub fn with_disposer(mut self, disposer: Option<Box<dyn Disposer>>) -> Self {
        self.disposer = disposer;
        self
    }

    /// Where newly assigned extensions are persisted after a batch.
    pub fn with_mappings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mappings_path = Some(path.into());
        self
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Runs one batch.
    ///
    /// # Errors
    ///
    /// Returns `BatchError` only for failed preconditions or when the
    /// resolver cannot read its answers; everything else is reported.
    pub fn run(
        &mut self,
        request: &BatchRequest,
        resolver: &mut dyn ExtensionResolver,
        observer: &mut dyn FnMut(BatchEvent<'_>),
    ) -> Result<BatchReport, BatchError> {
        let roots = validate(request)?;
        let mut report = BatchReport::new(request.dry_run);

        let enumeration = self.enumerate(&roots.origin, &mut report);
        report.files_found = enumeration.files.len() + enumeration.filtered;
        report.filtered = enumeration.filtered;
        tracing::info!(
            origin = %roots.origin.display(),
            files = enumeration.files.len(),
            filtered = enumeration.filtered,
            directories = enumeration.directories.len(),
            "enumerated origin"
        );

        report.extensions_assigned =
            resolver::resolve_unknown(&enumeration.files, &mut self.registry, resolver)?;

        observer(BatchEvent::Started {
            files: enumeration.files.len(),
        });

        let destinations = Destinations::new(&roots.destination, roots.copy_destination.clone());
        let mut log = OperationLog::new(roots.origin.clone(), roots.destination.clone());
        let mut reserved: HashSet<PathBuf> = HashSet::new();

        for path in &enumeration.files {
            if request.dry_run {
                self.plan_file(path, &destinations, &mut reserved, &mut report, observer);
            } else {
                self.relocate_file(path, &destinations, &mut log, &mut report, observer);
            }
            observer(BatchEvent::Processed);
        }

        if request.dry_run {
            return Ok(report);
        }

        self.dispose_directories(enumeration.directories, &mut report);

        if !log.is_empty()
            && let Err(e) = log.save()
        {
            tracing::warn!("journal not written: {}", e);
            report.warnings.push(e.to_string());
        }

        if let Some(path) = &self.mappings_path
            && let Err(e) = self.registry.save_if_dirty(path)
        {
            tracing::warn!("mapping store not written: {}", e);
            report.warnings.push(e.to_string());
        }

        Ok(report)
    }

    fn enumerate(&self, origin: &Path, report: &mut BatchReport) -> Enumeration {
        let mut enumeration = Enumeration::default();

        for entry in WalkDir::new(origin).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(origin).to_path_buf();
                    tracing::warn!(path = %path.display(), "cannot read entry: {}", e);
                    report.record_error(ErrorKind::Directory, &path, e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                enumeration.directories.push(entry.into_path());
                continue;
            }

            // Journals of earlier runs into this tree are never sources.
            if entry.file_name() == HISTORY_FILE {
                tracing::debug!(path = %entry.path().display(), "journal skipped");
                continue;
            }

            let relative = entry.path().strip_prefix(origin).unwrap_or(entry.path());
            if !self.filters.should_include(relative) {
                tracing::debug!(path = %entry.path().display(), "filtered");
                enumeration.filtered += 1;
                continue;
            }
            enumeration.files.push(entry.into_path());
        }

        enumeration
    }

    fn relocate_file(
        &self,
        path: &Path,
        destinations: &Destinations,
        log: &mut OperationLog,
        report: &mut BatchReport,
        observer: &mut dyn FnMut(BatchEvent<'_>),
    ) {
        let moved = FileRecord::build(path, &self.registry, &self.composer, destinations).and_then(
            |mut record| {
                match Relocator::prepare(&record) {
                    // A blocked copy tree must not keep the file in the origin;
                    // copy_file retries and reports it as a copy failure.
                    Err(FileError::DirectoryCreation { path, .. })
                        if record.copy_dir() == Some(path.as_path()) =>
                    {
                        tracing::debug!(path = %path.display(), "copy directory unavailable");
                    }
                    other => other?,
                }
                Relocator::move_file(&mut record)?;
                Ok(record)
            },
        );

        let record = match moved {
            Ok(record) => record,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(path = %path.display(), "{}", reason);
                observer(BatchEvent::Failed { path, reason: &reason });
                report.record_error(ErrorKind::File, path, reason);
                return;
            }
        };

        let Some(new_path) = record.moved_to().map(Path::to_path_buf) else {
            return;
        };
        observer(BatchEvent::Moved {
            from: path,
            to: &new_path,
        });

        let copy_path = if record.copy_dir().is_some() {
            match Relocator::copy_file(&record) {
                Ok(copy) => {
                    observer(BatchEvent::Copied { to: &copy });
                    Some(copy)
                }
                Err(e) => {
                    tracing::warn!(path = %new_path.display(), "copy failed: {}", e);
                    report.record_error(ErrorKind::Copy, &new_path, e);
                    None
                }
            }
        } else {
            None
        };

        let category = record.category().label().to_string();
        report.count_category(&category);
        let operation = Operation {
            original_path: path.to_path_buf(),
            new_path,
            category,
            copy_path,
        };
        log.add_operation(operation.clone());
        report.moved.push(operation);
    }

    fn plan_file(
        &self,
        path: &Path,
        destinations: &Destinations,
        reserved: &mut HashSet<PathBuf>,
        report: &mut BatchReport,
        observer: &mut dyn FnMut(BatchEvent<'_>),
    ) {
        let mut record =
            match FileRecord::build(path, &self.registry, &self.composer, destinations) {
                Ok(record) => record,
                Err(e) => {
                    let reason = e.to_string();
                    observer(BatchEvent::Failed { path, reason: &reason });
                    report.record_error(ErrorKind::File, path, reason);
                    return;
                }
            };

        let to = record.resolve_destination_with(|candidate| {
            reserved.contains(candidate) || unique_path::is_occupied(candidate)
        });
        reserved.insert(to.clone());
        observer(BatchEvent::Planned { from: path, to: &to });

        let category = record.category().label().to_string();
        report.count_category(&category);
        report.planned.push(PlannedMove {
            from: path.to_path_buf(),
            to,
            category,
            copy_dir: record.copy_dir().map(Path::to_path_buf),
        });
    }

    fn dispose_directories(&self, mut directories: Vec<PathBuf>, report: &mut BatchReport) {
        let Some(disposer) = &self.disposer else {
            return;
        };

        directories.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
        for dir in directories {
            match disposer.dispose(&dir) {
                Ok(()) => {
                    tracing::debug!(path = %dir.display(), "directory disposed");
                    report.disposed.push(dir);
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), "{}", e);
                    report.record_error(ErrorKind::Directory, &dir, e);
                }
            }
        }
    }
}

/// Checks the roots before any file is touched.
fn validate(request: &BatchRequest) -> Result<Roots, BatchError> {
    if !request.origin.is_dir() {
        return Err(BatchError::OriginMissing {
            path: request.origin.clone(),
        });
    }
    if !request.destination.is_dir() {
        return Err(BatchError::DestinationMissing {
            path: request.destination.clone(),
        });
    }
    if let Some(copy) = &request.copy_destination
        && !copy.is_dir()
    {
        return Err(BatchError::CopyDestinationMissing { path: copy.clone() });
    }

    let origin = canonical(&request.origin)?;
    let destination = canonical(&request.destination)?;
    let copy_destination = request
        .copy_destination
        .as_deref()
        .map(canonical)
        .transpose()?;

    for inner in std::iter::once(&destination).chain(copy_destination.as_ref()) {
        if inner.starts_with(&origin) {
            return Err(BatchError::InsideOrigin {
                inner: inner.clone(),
                origin,
            });
        }
    }

    let mut entries = fs::read_dir(&origin).map_err(|source| BatchError::Io {
        path: origin.clone(),
        source,
    })?;
    if entries.next().is_none() {
        return Err(BatchError::OriginEmpty { path: origin });
    }

    Ok(Roots {
        origin,
        destination,
        copy_destination,
    })
}

fn canonical(path: &Path) -> Result<PathBuf, BatchError> {
    path.canonicalize().map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })
}
