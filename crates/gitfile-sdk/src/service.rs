//! Commit-then-publish file operations.

use std::sync::Arc;

use async_trait::async_trait;
use gitfile_refs::{branch_ref, InMemoryRefStore};
use gitfile_store::InMemoryObjectStore;
use gitfile_sync::{
    Combiner, CoordinatorConfig, LocalRemote, PublishCoordinator, PushStatus, RemoteTransport,
    RepoHandle, ResultHandle, Submitter, SyncError,
};
use gitfile_types::{ObjectId, RepoPath};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{SdkError, SdkResult};
use crate::repository::{open_dir, FileChange, FileContents, Repository};

/// The outcome every member of a publish batch receives.
pub type PublishOutcome = Result<PushStatus, Arc<SyncError>>;

/// Pushes the branch once for a whole batch of commits.
///
/// The commits in a batch are already on the local branch, so a single push
/// of its tip publishes all of them.
struct PushCombiner {
    transport: Arc<dyn RemoteTransport>,
    ref_name: String,
}

#[async_trait]
impl Combiner<ObjectId, PublishOutcome> for PushCombiner {
    async fn combine(&self, commits: Vec<ObjectId>) -> PublishOutcome {
        debug!(ref_name = %self.ref_name, commits = commits.len(), "pushing batch");
        self.transport.push(&self.ref_name).await.map_err(Arc::new)
    }
}

/// A seat in an upcoming publish batch, taken before the commit is known.
///
/// Every seat taken before another participant submits joins that
/// participant's push. Dropping it leaves the batch.
pub struct PendingPublish {
    submitter: Submitter<ObjectId>,
    result: ResultHandle<PublishOutcome>,
}

impl PendingPublish {
    /// Submit `commit` and wait for the batch's push.
    pub async fn complete(self, commit: ObjectId) -> SdkResult<PushStatus> {
        self.submitter.submit(commit)?;
        self.result
            .wait()
            .await?
            .map_err(|e| SdkError::from(e.as_ref()))
    }
}

/// File operations that commit locally and then publish to a remote.
///
/// Commits are serialized by the repository lock; publishing happens after
/// the lock is released, through a coordinator that turns concurrent
/// publishes into one push. Callers that stage several commits can take
/// their seats up front with [`begin_publish`](Self::begin_publish).
pub struct FileService {
    repo: Arc<Repository>,
    coordinator: PublishCoordinator<ObjectId, PublishOutcome>,
}

impl FileService {
    pub fn new(
        repo: Arc<Repository>,
        transport: Arc<dyn RemoteTransport>,
        config: CoordinatorConfig,
    ) -> Self {
        let combiner = PushCombiner {
            transport,
            ref_name: branch_ref(repo.branch()),
        };
        Self {
            repo,
            coordinator: PublishCoordinator::spawn(combiner, config),
        }
    }

    /// Clone the configured remote and start a service on top of it.
    pub async fn from_config(config: &ProviderConfig) -> SdkResult<Self> {
        config.validate()?;
        let remote = open_dir(&config.remote_dir()?)?;
        let local = match &config.work_dir {
            Some(dir) => open_dir(dir)?,
            None => RepoHandle::new(
                Arc::new(InMemoryObjectStore::new()),
                Arc::new(InMemoryRefStore::new()),
            ),
        };
        let transport = Arc::new(LocalRemote::new(local.clone(), remote));
        let repo = Repository::clone_from(transport.as_ref(), local, config).await?;
        Ok(Self::new(
            Arc::new(repo),
            transport,
            config.coordinator_config(),
        ))
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub async fn write_file(&self, path: &RepoPath, contents: &[u8]) -> SdkResult<FileChange> {
        let change = self.repo.write_file(path, contents)?;
        self.publish(change.commit).await?;
        Ok(change)
    }

    pub async fn delete_file(&self, path: &RepoPath) -> SdkResult<FileChange> {
        let change = self.repo.delete_file(path)?;
        self.publish(change.commit).await?;
        Ok(change)
    }

    pub fn read_file(&self, path: &RepoPath) -> SdkResult<FileContents> {
        self.repo.read_file(path)
    }

    /// Reserve a place in the next publish batch.
    pub fn begin_publish(&self) -> SdkResult<PendingPublish> {
        let (submitter, result) = self.coordinator.announce()?;
        Ok(PendingPublish { submitter, result })
    }

    /// Join the next publish batch with `commit` and wait for its outcome.
    pub async fn publish(&self, commit: ObjectId) -> SdkResult<PushStatus> {
        self.begin_publish()?.complete(commit).await
    }

    /// Publish whatever the local branch holds.
    pub async fn push(&self) -> SdkResult<PushStatus> {
        match self.repo.head()? {
            Some(head) => self.publish(head).await,
            None => Err(SdkError::PublishFailure(format!(
                "branch {} has no commits",
                self.repo.branch()
            ))),
        }
    }

    /// Finish any in-flight publish cycle and stop the coordinator.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }

    /// Number of pushes performed so far.
    pub fn publish_cycles(&self) -> u64 {
        self.coordinator.cycles()
    }
}
