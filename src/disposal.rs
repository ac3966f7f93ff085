//! Disposal of emptied source directories.
//!
//! Only directories that are empty at the moment of disposal are touched.
//! Anything still inside (skipped files, unknown extensions) keeps the
//! directory alive and is reported as `Directory not empty`.

use std::fs;
use std::path::Path;

use crate::config::DisposalMethod;
use crate::error::DisposalError;

pub trait Disposer {
    /// Disposes of `dir` if it is empty.
    fn dispose(&self, dir: &Path) -> Result<(), DisposalError>;
}

/// Sends empty directories to the platform trash.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrashDisposer;

impl Disposer for TrashDisposer {
    fn dispose(&self, dir: &Path) -> Result<(), DisposalError> {
        ensure_empty(dir)?;
        trash::delete(dir).map_err(|e| DisposalError::Trash {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Deletes empty directories outright.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveDisposer;

impl Disposer for RemoveDisposer {
    fn dispose(&self, dir: &Path) -> Result<(), DisposalError> {
        ensure_empty(dir)?;
        fs::remove_dir(dir).map_err(|source| DisposalError::Io {
            path: dir.to_path_buf(),
            source,
        })
    }
}

/// The disposer for a configured method; `None` for [`DisposalMethod::Keep`].
pub fn for_method(method: DisposalMethod) -> Option<Box<dyn Disposer>> {
    match method {
        DisposalMethod::Trash => Some(Box::new(TrashDisposer)),
        DisposalMethod::Remove => Some(Box::new(RemoveDisposer)),
        DisposalMethod::Keep => None,
    }
}

fn ensure_empty(dir: &Path) -> Result<(), DisposalError> {
    let mut entries = fs::read_dir(dir).map_err(|source| DisposalError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    if entries.next().is_some() {
        return Err(DisposalError::NotEmpty {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}
