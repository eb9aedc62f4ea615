use gitfile_store::StoreError;

/// Errors from tree mutation.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A segment expected to be a directory is a file, or the reverse.
    #[error("path conflict at {path}: {reason}")]
    PathConflict { path: String, reason: String },

    /// No file exists at the path.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Reading or writing a tree or blob object failed.
    #[error("object store error: {0}")]
    Store(#[from] StoreError),
}

pub type TreeResult<T> = Result<T, TreeError>;
