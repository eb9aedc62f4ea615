use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gitfile_refs::{
    branch_ref, names::validate_branch_name, FsRefStore, InMemoryRefStore, Ref, RefStore,
    RefUpdater, HEAD,
};
use gitfile_store::{Commit, FsObjectStore, InMemoryObjectStore, ObjectStore};
use gitfile_sync::local::is_ancestor;
use gitfile_sync::{RemoteTransport, RepoHandle};
use gitfile_tree::{TreeMutator, TreeResult};
use gitfile_types::{ObjectId, RepoPath, Signature};
use tracing::{info, warn};

use crate::commit::CommitBuilder;
use crate::config::ProviderConfig;
use crate::error::{SdkError, SdkResult};

/// Name and email stamped on every commit a repository makes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    fn signature(&self) -> Signature {
        Signature::now(&self.name, &self.email)
    }
}

/// Outcome of a committed file change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    pub commit: ObjectId,
    pub tree: ObjectId,
    /// The blob now at the path; `None` after a delete.
    pub blob: Option<ObjectId>,
}

/// A file read from HEAD.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileContents {
    pub blob: ObjectId,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub id: ObjectId,
    pub commit: Commit,
}

/// Open (or create) the stores of a repository directory.
///
/// Objects live under `<dir>/objects`; `HEAD` and `refs/` sit directly in
/// `<dir>`.
pub fn open_dir(dir: &Path) -> SdkResult<RepoHandle> {
    let objects = FsObjectStore::open(dir.join("objects"))?;
    let refs = FsRefStore::open(dir)?;
    Ok(RepoHandle::new(Arc::new(objects), Arc::new(refs)))
}

/// A locked session over one repository.
///
/// Every operation runs with the repository lock held, so a file change
/// (read HEAD, rewrite the tree, store the commit, advance the branch) is
/// atomic with respect to every other operation on the same session. The
/// lock is not reentrant and is never held across a publish.
pub struct Repository {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    identity: Identity,
    branch: String,
    lock: Mutex<()>,
}

impl Repository {
    /// Wrap existing stores with HEAD pointing at `branch`.
    ///
    /// A HEAD left on another branch (or detached) by an earlier session is
    /// re-pointed, so commits land on the branch that gets published. The
    /// other branch keeps its commits.
    pub fn init(handle: RepoHandle, branch: &str, identity: Identity) -> SdkResult<Self> {
        validate_branch_name(branch)?;
        let head = Ref::Symbolic(branch_ref(branch));
        match handle.refs.head()? {
            Some(current) if current == head => {}
            Some(current) => {
                info!(from = ?current, %branch, "switching HEAD to configured branch");
                handle.refs.write_ref(HEAD, &head)?;
            }
            None => handle.refs.write_ref(HEAD, &head)?,
        }
        Ok(Self {
            objects: handle.objects,
            refs: handle.refs,
            identity,
            branch: branch.to_string(),
            lock: Mutex::new(()),
        })
    }

    /// An empty repository on `main` that lives only in memory.
    pub fn in_memory(identity: Identity) -> SdkResult<Self> {
        let handle = RepoHandle::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        );
        Self::init(handle, "main", identity)
    }

    /// Set up `local` as a copy of the configured branch of `transport`.
    ///
    /// The local branch is moved to the remote tip unless it already
    /// contains it, in which case unpublished local commits are kept. An
    /// unborn remote branch leaves the local branch as it was.
    pub async fn clone_from(
        transport: &dyn RemoteTransport,
        local: RepoHandle,
        config: &ProviderConfig,
    ) -> SdkResult<Self> {
        let repo = Self::init(local, &config.branch, config.identity())?;
        let slot = branch_ref(&config.branch);
        let Some(remote_tip) = transport.fetch(&slot).await? else {
            info!(branch = %config.branch, "remote branch is unborn");
            return Ok(repo);
        };

        repo.adopt_remote_tip(&slot, remote_tip)?;
        Ok(repo)
    }

    pub fn handle(&self) -> RepoHandle {
        RepoHandle::new(Arc::clone(&self.objects), Arc::clone(&self.refs))
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The commit HEAD resolves to, or `None` on an unborn branch.
    pub fn head(&self) -> SdkResult<Option<ObjectId>> {
        let _guard = self.lock();
        Ok(RefUpdater::new(self.refs.as_ref()).resolve(HEAD)?.target)
    }

    /// Create or overwrite the file at `path` and commit the change.
    pub fn write_file(&self, path: &RepoPath, contents: &[u8]) -> SdkResult<FileChange> {
        let _guard = self.lock();
        let blob = self.objects.write_blob(contents)?;
        self.commit_change(&format!("Add/Update {path}"), Some(blob), |mutator, root| {
            mutator.upsert(root, path, blob)
        })
    }

    /// Remove the file at `path` and commit the change.
    pub fn delete_file(&self, path: &RepoPath) -> SdkResult<FileChange> {
        let _guard = self.lock();
        self.commit_change(&format!("Delete {path}"), None, |mutator, root| {
            mutator.remove(root, path)
        })
    }

    /// Read the file at `path` in the HEAD commit.
    pub fn read_file(&self, path: &RepoPath) -> SdkResult<FileContents> {
        let _guard = self.lock();
        let head = RefUpdater::new(self.refs.as_ref()).resolve(HEAD)?;
        let Some(commit) = head.target else {
            return Err(SdkError::PathNotFound(path.to_string()));
        };
        let tree = self.objects.read_commit(&commit)?.tree;
        let blob = TreeMutator::new(self.objects.as_ref()).lookup(&tree, path)?;
        let data = self.objects.read_blob(&blob)?.data;
        Ok(FileContents { blob, data })
    }

    /// Up to `limit` commits from HEAD, newest first, following first parents.
    pub fn log(&self, limit: usize) -> SdkResult<Vec<LogEntry>> {
        let _guard = self.lock();
        let mut next = RefUpdater::new(self.refs.as_ref()).resolve(HEAD)?.target;
        let mut entries = Vec::new();
        while let Some(id) = next {
            if entries.len() >= limit {
                break;
            }
            let commit = self.objects.read_commit(&id)?;
            next = commit.parent();
            entries.push(LogEntry { id, commit });
        }
        Ok(entries)
    }

    fn adopt_remote_tip(&self, slot: &str, remote_tip: ObjectId) -> SdkResult<()> {
        let _guard = self.lock();
        let updater = RefUpdater::new(self.refs.as_ref());
        let local_tip = updater.resolve(slot)?.target;
        if let Some(tip) = local_tip {
            if is_ancestor(self.objects.as_ref(), remote_tip, tip)? {
                info!(local = %tip.short_hex(), "local branch already contains remote tip");
                return Ok(());
            }
            warn!(
                local = %tip.short_hex(),
                remote = %remote_tip.short_hex(),
                "local branch diverged from remote, resetting"
            );
        }
        updater.advance(slot, remote_tip)?;
        info!(slot, tip = %remote_tip.short_hex(), "branch set to remote tip");
        Ok(())
    }

    /// Rewrite HEAD's tree with `mutate` and advance the branch. The caller
    /// holds the lock.
    fn commit_change(
        &self,
        message: &str,
        blob: Option<ObjectId>,
        mutate: impl FnOnce(&TreeMutator<'_>, &ObjectId) -> TreeResult<ObjectId>,
    ) -> SdkResult<FileChange> {
        let updater = RefUpdater::new(self.refs.as_ref());
        let parent = updater.resolve(HEAD)?.target;
        let mutator = TreeMutator::new(self.objects.as_ref());
        let base = match parent {
            Some(commit) => self.objects.read_commit(&commit)?.tree,
            None => mutator.empty_root()?,
        };
        let tree = mutate(&mutator, &base)?;

        let commit = CommitBuilder::new(tree, self.identity.signature(), message)
            .with_parent(parent)
            .store(self.objects.as_ref())?;
        updater.advance(HEAD, commit)?;

        info!(commit = %commit.short_hex(), %message, "committed");
        Ok(FileChange { commit, tree, blob })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        Repository::in_memory(Identity::new("Test", "test@example.com")).unwrap()
    }

    fn path(raw: &str) -> RepoPath {
        RepoPath::parse(raw).unwrap()
    }

    #[test]
    fn fresh_repository_is_unborn() {
        let repo = repo();
        assert_eq!(repo.head().unwrap(), None);
        assert!(repo.log(10).unwrap().is_empty());
        assert!(matches!(
            repo.read_file(&path("a.txt")),
            Err(SdkError::PathNotFound(_))
        ));
    }

    #[test]
    fn write_then_read_at_several_depths() {
        let repo = repo();
        for raw in ["top.txt", "a/b/c.txt", "a/b/c/d/e.txt"] {
            repo.write_file(&path(raw), raw.as_bytes()).unwrap();
        }
        for raw in ["top.txt", "a/b/c.txt", "a/b/c/d/e.txt"] {
            assert_eq!(repo.read_file(&path(raw)).unwrap().data, raw.as_bytes());
        }
    }

    #[test]
    fn end_to_end_update_and_delete() {
        let repo = repo();
        let p = path("docs/readme.md");

        let r1 = repo.write_file(&p, b"hello").unwrap();
        let r2 = repo.write_file(&p, b"world").unwrap();
        assert_ne!(r1.tree, r2.tree);
        assert_eq!(repo.read_file(&p).unwrap().data, b"world");

        let r3 = repo.delete_file(&p).unwrap();
        assert_ne!(r3.tree, r2.tree);
        assert_eq!(r3.blob, None);
        assert!(matches!(repo.read_file(&p), Err(SdkError::PathNotFound(_))));
    }

    #[test]
    fn commits_chain_with_messages() {
        let repo = repo();
        let p = path("notes.txt");
        let first = repo.write_file(&p, b"1").unwrap();
        let second = repo.write_file(&p, b"2").unwrap();
        let third = repo.delete_file(&p).unwrap();

        let log = repo.log(10).unwrap();
        let ids: Vec<_> = log.iter().map(|e| e.id).collect();
        assert_eq!(ids, [third.commit, second.commit, first.commit]);
        assert_eq!(log[0].commit.message, "Delete notes.txt");
        assert_eq!(log[1].commit.message, "Add/Update notes.txt");
        assert!(log[2].commit.parents.is_empty());
        assert_eq!(log[1].commit.parent(), Some(first.commit));
        assert_eq!(repo.log(1).unwrap().len(), 1);
    }

    #[test]
    fn blob_id_is_content_address() {
        let repo = repo();
        let a = repo.write_file(&path("a.txt"), b"same").unwrap();
        let b = repo.write_file(&path("b.txt"), b"same").unwrap();
        assert_eq!(a.blob, b.blob);
        assert_eq!(repo.read_file(&path("a.txt")).unwrap().blob, a.blob.unwrap());
    }

    #[test]
    fn conflict_leaves_head_untouched() {
        let repo = repo();
        let before = repo.write_file(&path("a"), b"file").unwrap();
        assert!(matches!(
            repo.write_file(&path("a/b"), b"nested"),
            Err(SdkError::PathConflict { .. })
        ));
        assert_eq!(repo.head().unwrap(), Some(before.commit));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let repo = repo();
        repo.write_file(&path("a.txt"), b"x").unwrap();
        assert!(matches!(
            repo.delete_file(&path("b.txt")),
            Err(SdkError::PathNotFound(_))
        ));
    }

    #[test]
    fn concurrent_writers_are_serialized() {
        let repo = Arc::new(repo());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    repo.write_file(&path(&format!("dir/f{i}.txt")), format!("{i}").as_bytes())
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(repo.log(100).unwrap().len(), 8);
        for i in 0..8 {
            let data = repo.read_file(&path(&format!("dir/f{i}.txt"))).unwrap().data;
            assert_eq!(data, format!("{i}").as_bytes());
        }
    }

    #[test]
    fn on_disk_repository_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let identity = Identity::new("Test", "test@example.com");
        let p = path("docs/readme.md");
        {
            let repo = Repository::init(open_dir(dir.path()).unwrap(), "main", identity.clone())
                .unwrap();
            repo.write_file(&p, b"persisted").unwrap();
        }
        let repo = Repository::init(open_dir(dir.path()).unwrap(), "main", identity).unwrap();
        assert_eq!(repo.read_file(&p).unwrap().data, b"persisted");
        assert!(dir.path().join("refs/heads/main").is_file());
    }

    #[test]
    fn reopen_on_other_branch_moves_head() {
        let handle = RepoHandle::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        );
        let identity = Identity::new("Test", "test@example.com");
        let on_main = Repository::init(handle.clone(), "main", identity.clone()).unwrap();
        let main_commit = on_main.write_file(&path("a.txt"), b"main").unwrap().commit;

        let repo = Repository::init(handle.clone(), "dev", identity).unwrap();
        assert_eq!(
            handle.refs.head().unwrap(),
            Some(Ref::Symbolic(branch_ref("dev")))
        );
        assert_eq!(repo.head().unwrap(), None);

        let dev_commit = repo.write_file(&path("b.txt"), b"dev").unwrap().commit;
        let updater = RefUpdater::new(handle.refs.as_ref());
        assert_eq!(updater.resolve_target(&branch_ref("dev")).unwrap(), dev_commit);
        assert_eq!(updater.resolve_target(&branch_ref("main")).unwrap(), main_commit);
    }

    #[test]
    fn invalid_branch_is_rejected() {
        let handle = RepoHandle::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        );
        assert!(matches!(
            Repository::init(handle, "bad..branch", Identity::new("a", "b")),
            Err(SdkError::RefUpdateFailed(_))
        ));
    }
}
