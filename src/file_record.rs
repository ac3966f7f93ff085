//! Per-file derived values.
//!
//! A [`FileRecord`] is built from a source path once its extension has been
//! classified. Derived fields are computed in a fixed order at construction:
//! modification time, then year, then the naming fields. The unique stem is
//! left unresolved until just before the move so it reflects the destination
//! directory as it is at that moment.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::date_extractor;
use crate::error::FileError;
use crate::file_category::{Category, ExtensionRegistry, normalize_extension};
use crate::name_composer::NameComposer;
use crate::unique_path;

/// Destination roots for one batch.
#[derive(Debug, Clone)]
pub struct Destinations {
    pub root: PathBuf,
    pub copy_root: Option<PathBuf>,
}

impl Destinations {
    pub fn new(root: impl Into<PathBuf>, copy_root: Option<PathBuf>) -> Self {
        Self {
            root: root.into(),
            copy_root,
        }
    }
}

/// Extension (lower-cased, with leading dot) of `path`, if any.
///
/// Dot files such as `.bashrc` have no extension.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .filter(|ext| !ext.is_empty())
        .map(|ext| normalize_extension(&ext))
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    original_path: PathBuf,
    original_stem: String,
    extension: String,
    category: Category,
    modified_at: DateTime<Local>,
    year: String,
    ymd_matched: bool,
    proposed_stem: String,
    relative_dir: PathBuf,
    destination_dir: PathBuf,
    copy_dir: Option<PathBuf>,
    unique_stem: Option<String>,
    moved_to: Option<PathBuf>,
}

impl FileRecord {
    /// Classifies `path` and derives its naming fields.
    ///
    /// # Errors
    ///
    /// - `NoExtension` / `InvalidExtension` when classification fails
    /// - `SourceMissing` / `Metadata` when the modification time cannot be read
    pub fn build(
        path: &Path,
        registry: &ExtensionRegistry,
        composer: &NameComposer,
        destinations: &Destinations,
    ) -> Result<Self, FileError> {
        let extension = extension_of(path).ok_or(FileError::NoExtension)?;
        let category = registry.classify(&extension)?;

        let original_stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let modified_at = date_extractor::modified_at(path)?;
        let year = date_extractor::year(&original_stem, &modified_at);
        let ymd_matched = date_extractor::matches_ymd(&original_stem);
        let proposed_stem = composer.compose(&category, &original_stem, &modified_at, ymd_matched);

        let relative_dir = PathBuf::from(&year).join(category.label());
        let destination_dir = destinations.root.join(&relative_dir);
        let copy_dir = destinations
            .copy_root
            .as_ref()
            .map(|root| root.join(&relative_dir));

        tracing::debug!(
            path = %path.display(),
            category = %category,
            year = %year,
            proposed = %proposed_stem,
            "derived destination"
        );

        Ok(Self {
            original_path: path.to_path_buf(),
            original_stem,
            extension,
            category,
            modified_at,
            year,
            ymd_matched,
            proposed_stem,
            relative_dir,
            destination_dir,
            copy_dir,
            unique_stem: None,
            moved_to: None,
        })
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn original_stem(&self) -> &str {
        &self.original_stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn modified_at(&self) -> &DateTime<Local> {
        &self.modified_at
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    /// Whether the original stem starts with a YMD date.
    pub fn ymd_matched(&self) -> bool {
        self.ymd_matched
    }

    pub fn proposed_stem(&self) -> &str {
        &self.proposed_stem
    }

    /// `{year}/{category}`.
    pub fn relative_dir(&self) -> &Path {
        &self.relative_dir
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn copy_dir(&self) -> Option<&Path> {
        self.copy_dir.as_deref()
    }

    pub fn unique_stem(&self) -> Option<&str> {
        self.unique_stem.as_deref()
    }

    /// Resolves the unique stem against the destination directory as it is now.
    pub fn resolve_destination(&mut self) -> PathBuf {
        self.resolve_destination_with(unique_path::is_occupied)
    }

    /// Resolves the unique stem with a caller-supplied occupancy check.
    pub fn resolve_destination_with<F>(&mut self, occupied: F) -> PathBuf
    where
        F: FnMut(&Path) -> bool,
    {
        let stem = unique_path::resolve_with(
            &self.destination_dir,
            &self.proposed_stem,
            &self.extension,
            occupied,
        );
        let path = self.destination_dir.join(format!("{stem}{}", self.extension));
        self.unique_stem = Some(stem);
        path
    }

    /// The resolved destination, once [`FileRecord::resolve_destination`] ran.
    pub fn destination_path(&self) -> Option<PathBuf> {
        self.unique_stem
            .as_ref()
            .map(|stem| self.destination_dir.join(format!("{stem}{}", self.extension)))
    }

    /// Where the file actually landed, after a successful move.
    pub fn moved_to(&self) -> Option<&Path> {
        self.moved_to.as_deref()
    }

    pub(crate) fn mark_moved(&mut self, path: PathBuf) {
        self.moved_to = Some(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::CategoryTable;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, when: DateTime<Local>) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::from(when)).unwrap();
        path
    }

    fn build(path: &Path, root: &Path) -> Result<FileRecord, FileError> {
        let registry = ExtensionRegistry::new(CategoryTable::default(), "ignore");
        FileRecord::build(
            path,
            &registry,
            &NameComposer::default(),
            &Destinations::new(root, None),
        )
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/IMG.JPG")).as_deref(), Some(".jpg"));
        assert_eq!(extension_of(Path::new("a/archive.tar.gz")).as_deref(), Some(".gz"));
        assert_eq!(extension_of(Path::new("a/README")), None);
        assert_eq!(extension_of(Path::new("a/.bashrc")), None);
    }

    #[test]
    fn test_photo_record() {
        let temp_dir = TempDir::new().unwrap();
        let when = Local.with_ymd_and_hms(2021, 3, 4, 10, 0, 0).unwrap();
        let path = touch(temp_dir.path(), "IMG.JPG", when);

        let mut record = build(&path, Path::new("/out")).unwrap();
        assert_eq!(record.category().label(), "photos");
        assert_eq!(record.extension(), ".jpg");
        assert_eq!(record.year(), "2021");
        assert_eq!(record.relative_dir(), Path::new("2021/photos"));
        assert_eq!(record.proposed_stem(), "2021-03-04 10.00.00");
        assert!(record.destination_path().is_none());

        let destination = record.resolve_destination();
        assert_eq!(destination, PathBuf::from("/out/2021/photos/2021-03-04 10.00.00.jpg"));
        assert_eq!(record.unique_stem(), Some("2021-03-04 10.00.00"));
        assert_eq!(record.destination_path(), Some(destination));
    }

    #[test]
    fn test_embedded_year_wins() {
        let temp_dir = TempDir::new().unwrap();
        let when = Local.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        let path = touch(temp_dir.path(), "2020-02-31-notes.txt", when);

        let record = build(&path, Path::new("/out")).unwrap();
        assert!(record.ymd_matched());
        assert_eq!(record.year(), "2020");
        assert_eq!(record.category().label(), "documents");
        assert_eq!(record.proposed_stem(), "2020-02-31-notes");
        assert_eq!(record.destination_dir(), Path::new("/out/2020/documents"));
    }

    #[test]
    fn test_classification_errors() {
        let temp_dir = TempDir::new().unwrap();
        let when = Local.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();

        let bare = touch(temp_dir.path(), "README", when);
        assert!(matches!(
            build(&bare, Path::new("/out")),
            Err(FileError::NoExtension)
        ));

        let unknown = touch(temp_dir.path(), "data.xyz", when);
        let err = build(&unknown, Path::new("/out")).unwrap_err();
        assert_eq!(err.to_string(), "Extension invalid");

        let ignored = touch(temp_dir.path(), "download.part", when);
        assert!(matches!(
            build(&ignored, Path::new("/out")),
            Err(FileError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = build(&temp_dir.path().join("ghost.jpg"), Path::new("/out"));
        assert!(matches!(result, Err(FileError::SourceMissing { .. })));
    }

    #[test]
    fn test_copy_dir_follows_relative_dir() {
        let temp_dir = TempDir::new().unwrap();
        let when = Local.with_ymd_and_hms(2019, 11, 2, 14, 30, 0).unwrap();
        let path = touch(temp_dir.path(), "clip.MOV", when);

        let registry = ExtensionRegistry::new(CategoryTable::default(), "ignore");
        let record = FileRecord::build(
            &path,
            &registry,
            &NameComposer::default(),
            &Destinations::new("/out", Some(PathBuf::from("/backup"))),
        )
        .unwrap();

        assert_eq!(record.copy_dir(), Some(Path::new("/backup/2019/videos")));
    }
}
