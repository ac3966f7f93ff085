//! Error types shared by the relocation pipeline.
//!
//! Per-file, per-copy and per-directory failures are recoverable: the batch
//! records them and carries on. Only [`BatchError`] aborts a run, and only
//! before any file has been touched.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::file_category::RegistryError;
use crate::resolver::ResolveError;

/// Failure to classify, name or move a single file.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file name carries no extension.
    #[error("No extension found")]
    NoExtension,

    /// The extension is unmapped or mapped to the ignore label.
    #[error("Extension invalid")]
    InvalidExtension { extension: String },

    /// The source vanished between enumeration and relocation.
    #[error("Source file not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// Modification time could not be read.
    #[error("Failed to read metadata of {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A destination directory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rename (or cross-device copy + remove) failed.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Maps an I/O error on `path` to `SourceMissing` when the file is gone.
    pub fn metadata(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::SourceMissing { path },
            _ => Self::Metadata { path, source },
        }
    }
}

/// Failure to place the secondary copy of a moved file.
#[derive(Debug, Error)]
pub enum CopyError {
    /// Copy invoked on a record whose move has not succeeded.
    #[error("Copy requested before {} was moved", path.display())]
    NotMoved { path: PathBuf },

    /// No copy root is configured for this record.
    #[error("No copy destination configured for {}", path.display())]
    NoCopyDestination { path: PathBuf },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to dispose of a visited directory.
#[derive(Debug, Error)]
pub enum DisposalError {
    #[error("Directory not empty")]
    NotEmpty { path: PathBuf },

    #[error("Failed to remove {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {} to trash: {message}", path.display())]
    Trash { path: PathBuf, message: String },
}

/// Errors that stop a batch before it starts.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Origin directory does not exist: {}", path.display())]
    OriginMissing { path: PathBuf },

    #[error("Destination directory does not exist: {}", path.display())]
    DestinationMissing { path: PathBuf },

    #[error("Copy destination directory does not exist: {}", path.display())]
    CopyDestinationMissing { path: PathBuf },

    #[error("Origin empty: {}", path.display())]
    OriginEmpty { path: PathBuf },

    #[error("{} lies inside the origin {}", inner.display(), origin.display())]
    InsideOrigin { inner: PathBuf, origin: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
