use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote store rejected or failed a call
    #[error("Remote store error: {0}")]
    Transport(#[from] BridgeError),

    #[error("Cache file {path} is corrupt: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Folder {segment:?} not found under {parent_id}")]
    PathNotFound { parent_id: String, segment: String },

    #[error("Folder {segment:?} under {parent_id} is ambiguous: {count} matches")]
    AmbiguousPath {
        parent_id: String,
        segment: String,
        count: usize,
    },

    #[error("Cannot derive an album name from {0}")]
    InvalidDirectory(PathBuf),

    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// Scoped to a single local file; the reconciler records it and moves on
    #[error("Failed to read {path}: {reason}")]
    LocalRead { path: PathBuf, reason: String },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SyncError::Io {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
