use std::fmt;
use std::io;
use std::path::PathBuf;

use tm_core::SnapshotError;

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    /// The location exists and is a file or a non-empty directory.
    NotEmpty(PathBuf),
    MissingSnapshot(PathBuf),
    Snapshot(SnapshotError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            StoreError::NotEmpty(path) => {
                write!(f, "`{}` is not an empty directory or is a file", path.display())
            }
            StoreError::MissingSnapshot(path) => {
                write!(f, "no snapshot at {}", path.display())
            }
            StoreError::Snapshot(e) => write!(f, "snapshot error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Snapshot(e) => Some(e),
            StoreError::NotEmpty(_) | StoreError::MissingSnapshot(_) => None,
        }
    }
}

impl From<SnapshotError> for StoreError {
    fn from(e: SnapshotError) -> Self {
        StoreError::Snapshot(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
