use async_trait::async_trait;
use gitfile_types::ObjectId;

use crate::error::SyncResult;
use crate::types::PushStatus;

/// Transport interface for a remote repository.
///
/// This is the operation a publish cycle invokes once per batch.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Publish the local commit behind `ref_name` to the same ref remotely.
    ///
    /// Fails with `NonFastForward` if the remote ref has diverged.
    async fn push(&self, ref_name: &str) -> SyncResult<PushStatus>;

    /// Copy the remote tip of `ref_name` and everything reachable from it
    /// into the local object store. Returns `None` if the remote ref is
    /// unborn. Local refs are left untouched.
    async fn fetch(&self, ref_name: &str) -> SyncResult<Option<ObjectId>>;
}
