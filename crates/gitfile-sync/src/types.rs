use std::sync::Arc;

use gitfile_refs::RefStore;
use gitfile_store::ObjectStore;
use gitfile_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Result of a successful push.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushStatus {
    /// The remote ref moved from `old` (unborn if `None`) to `new`.
    Updated { old: Option<ObjectId>, new: ObjectId },
    /// The remote already pointed at the local tip.
    UpToDate,
}

impl PushStatus {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, PushStatus::UpToDate)
    }
}

/// The two stores that make up a repository.
#[derive(Clone)]
pub struct RepoHandle {
    pub objects: Arc<dyn ObjectStore>,
    pub refs: Arc<dyn RefStore>,
}

impl RepoHandle {
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self { objects, refs }
    }
}

impl std::fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoHandle").finish_non_exhaustive()
    }
}
