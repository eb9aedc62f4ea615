use gitfile_refs::RefError;
use gitfile_store::StoreError;
use gitfile_types::ObjectId;
use thiserror::Error;

/// Errors from push and fetch.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote ref has history the local ref does not contain.
    #[error("not a fast-forward update for {ref_name}: remote {remote} is not an ancestor of {local}")]
    NonFastForward {
        ref_name: String,
        remote: ObjectId,
        local: ObjectId,
    },

    /// The local ref has no commit to push.
    #[error("nothing to push: {0} has no commits")]
    NothingToPush(String),

    /// The remote could not be reached or refused the operation.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("object store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Why a coordinator participant did not receive a combined outcome.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The coordinator has been closed and accepts no new participants.
    #[error("publish coordinator is closed")]
    Closed,

    /// The participant dropped its submitter without providing an input.
    #[error("participant abandoned its publish request")]
    Abandoned,

    /// The participant did not submit before the configured timeout.
    #[error("participant did not submit within {0:?}")]
    SubmitTimedOut(std::time::Duration),

    /// The input was not accepted because the participant already left
    /// the batch. The result handle carries the reason.
    #[error("submission rejected: participant is no longer in a batch")]
    Rejected,

    /// The coordinator task stopped without delivering an outcome.
    #[error("publish coordinator stopped unexpectedly")]
    Stopped,
}
