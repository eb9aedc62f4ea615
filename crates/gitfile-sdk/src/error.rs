use gitfile_refs::RefError;
use gitfile_store::StoreError;
use gitfile_sync::{PublishError, SyncError};
use gitfile_tree::TreeError;
use gitfile_types::TypeError;
use thiserror::Error;

/// Errors surfaced to callers of the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// A path segment that must be a directory is a file, or the reverse.
    #[error("path conflict at {path}: {reason}")]
    PathConflict { path: String, reason: String },

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] TypeError),

    #[error("object store error: {0}")]
    ObjectStore(#[from] StoreError),

    #[error("ref update failed: {0}")]
    RefUpdateFailed(#[from] RefError),

    /// The remote branch has diverged from local history.
    #[error("publish conflict: {0}")]
    PublishConflict(String),

    /// The publish attempt failed for any other reason.
    #[error("publish failed: {0}")]
    PublishFailure(String),

    #[error("missing attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: &'static str, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type SdkResult<T> = Result<T, SdkError>;

impl From<TreeError> for SdkError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::PathConflict { path, reason } => SdkError::PathConflict { path, reason },
            TreeError::PathNotFound(path) => SdkError::PathNotFound(path),
            TreeError::Store(e) => SdkError::ObjectStore(e),
        }
    }
}

impl From<&SyncError> for SdkError {
    fn from(e: &SyncError) -> Self {
        match e {
            SyncError::NonFastForward { .. } => SdkError::PublishConflict(e.to_string()),
            other => SdkError::PublishFailure(other.to_string()),
        }
    }
}

impl From<SyncError> for SdkError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Store(e) => SdkError::ObjectStore(e),
            SyncError::Ref(e) => SdkError::RefUpdateFailed(e),
            other => SdkError::from(&other),
        }
    }
}

impl From<PublishError> for SdkError {
    fn from(e: PublishError) -> Self {
        SdkError::PublishFailure(e.to_string())
    }
}
