//! In-process remote: pushes and fetches between two repositories whose
//! stores are both directly reachable (for example two directories on the
//! same machine).

use std::collections::HashSet;

use async_trait::async_trait;
use gitfile_refs::RefUpdater;
use gitfile_store::{Commit, ObjectKind, ObjectStore, StoreError, StoredObject, Tree};
use gitfile_types::ObjectId;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteTransport;
use crate::types::{PushStatus, RepoHandle};

/// A [`RemoteTransport`] backed by a second repository in the same process.
///
/// Pushes copy missing objects first and move the remote ref last, and only
/// when the move is a fast-forward.
pub struct LocalRemote {
    local: RepoHandle,
    remote: RepoHandle,
    // Ref updates carry no compare-and-swap; pushes through one transport
    // are serialized here.
    push_lock: Mutex<()>,
}

impl LocalRemote {
    pub fn new(local: RepoHandle, remote: RepoHandle) -> Self {
        Self {
            local,
            remote,
            push_lock: Mutex::new(()),
        }
    }

    pub fn remote(&self) -> &RepoHandle {
        &self.remote
    }
}

#[async_trait]
impl RemoteTransport for LocalRemote {
    async fn push(&self, ref_name: &str) -> SyncResult<PushStatus> {
        let _guard = self.push_lock.lock().await;

        let local_tip = RefUpdater::new(self.local.refs.as_ref())
            .resolve(ref_name)?
            .target
            .ok_or_else(|| SyncError::NothingToPush(ref_name.to_string()))?;
        let remote_updater = RefUpdater::new(self.remote.refs.as_ref());
        let remote_tip = remote_updater.resolve(ref_name)?.target;

        if remote_tip == Some(local_tip) {
            debug!(ref_name, tip = %local_tip.short_hex(), "remote up to date");
            return Ok(PushStatus::UpToDate);
        }
        if let Some(remote) = remote_tip {
            if !is_ancestor(self.local.objects.as_ref(), remote, local_tip)? {
                return Err(SyncError::NonFastForward {
                    ref_name: ref_name.to_string(),
                    remote,
                    local: local_tip,
                });
            }
        }

        let copied = copy_reachable(
            self.local.objects.as_ref(),
            self.remote.objects.as_ref(),
            local_tip,
        )?;
        remote_updater.advance(ref_name, local_tip)?;

        info!(
            ref_name,
            old = ?remote_tip.map(|id| id.short_hex()),
            new = %local_tip.short_hex(),
            objects = copied,
            "pushed"
        );
        Ok(PushStatus::Updated {
            old: remote_tip,
            new: local_tip,
        })
    }

    async fn fetch(&self, ref_name: &str) -> SyncResult<Option<ObjectId>> {
        let Some(tip) = RefUpdater::new(self.remote.refs.as_ref())
            .resolve(ref_name)?
            .target
        else {
            debug!(ref_name, "remote ref is unborn");
            return Ok(None);
        };
        let copied = copy_reachable(
            self.remote.objects.as_ref(),
            self.local.objects.as_ref(),
            tip,
        )?;
        info!(ref_name, tip = %tip.short_hex(), objects = copied, "fetched");
        Ok(Some(tip))
    }
}

/// Whether `ancestor` is reachable from `descendant` through parent links.
pub fn is_ancestor(
    store: &dyn ObjectStore,
    ancestor: ObjectId,
    descendant: ObjectId,
) -> SyncResult<bool> {
    let mut seen = HashSet::new();
    let mut queue = vec![descendant];
    while let Some(id) = queue.pop() {
        if id == ancestor {
            return Ok(true);
        }
        if !seen.insert(id) {
            continue;
        }
        match store.read_commit(&id) {
            Ok(commit) => queue.extend(commit.parents),
            // The remote tip is unknown locally: it cannot be in our history.
            Err(StoreError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(false)
}

/// Copy `tip` and every object reachable from it that `dst` lacks.
///
/// Objects are written children first, so an object present in `dst`
/// always has its whole closure present too and the walk can stop there.
/// Returns the number of objects copied.
pub fn copy_reachable(
    src: &dyn ObjectStore,
    dst: &dyn ObjectStore,
    tip: ObjectId,
) -> SyncResult<usize> {
    let mut copied = 0;
    let mut seen = HashSet::new();
    // `Some(object)` marks an object whose children are already queued.
    let mut stack: Vec<(ObjectId, Option<StoredObject>)> = vec![(tip, None)];
    while let Some((id, loaded)) = stack.pop() {
        if let Some(object) = loaded {
            dst.write(&object)?;
            copied += 1;
            continue;
        }
        if !seen.insert(id) || dst.exists(&id)? {
            continue;
        }
        let object = src.require(&id)?;
        let children: Vec<ObjectId> = match object.kind {
            ObjectKind::Commit => {
                let commit = Commit::from_stored_object(&object)?;
                std::iter::once(commit.tree).chain(commit.parents).collect()
            }
            ObjectKind::Tree => Tree::from_stored_object(&object)?
                .entries()
                .iter()
                .map(|e| e.object_id)
                .collect(),
            ObjectKind::Blob => Vec::new(),
        };
        stack.push((id, Some(object)));
        stack.extend(children.into_iter().map(|child| (child, None)));
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use gitfile_refs::{InMemoryRefStore, Ref, RefStore, HEAD};
    use gitfile_store::{InMemoryObjectStore, TreeEntry};
    use gitfile_types::Signature;

    use super::*;

    fn repo() -> RepoHandle {
        let refs = InMemoryRefStore::new();
        refs.write_ref(HEAD, &Ref::Symbolic("refs/heads/main".into()))
            .unwrap();
        RepoHandle::new(Arc::new(InMemoryObjectStore::new()), Arc::new(refs))
    }

    fn commit(repo: &RepoHandle, file: &[u8], parent: Option<ObjectId>) -> ObjectId {
        let blob = repo.objects.write_blob(file).unwrap();
        let tree = repo
            .objects
            .write_tree(&Tree::new(vec![TreeEntry::file("f.txt", blob)]))
            .unwrap();
        let sig = Signature::new("t", "t@example.com", Utc.timestamp_opt(0, 0).unwrap());
        let id = repo
            .objects
            .write_commit(&Commit {
                tree,
                parents: parent.into_iter().collect(),
                author: sig.clone(),
                committer: sig,
                message: "c".into(),
            })
            .unwrap();
        RefUpdater::new(repo.refs.as_ref()).advance(HEAD, id).unwrap();
        id
    }

    #[tokio::test]
    async fn first_push_creates_remote_branch() {
        let (local, remote) = (repo(), repo());
        let c1 = commit(&local, b"one", None);
        let transport = LocalRemote::new(local, remote.clone());

        let status = transport.push("refs/heads/main").await.unwrap();
        assert_eq!(status, PushStatus::Updated { old: None, new: c1 });
        assert_eq!(
            RefUpdater::new(remote.refs.as_ref()).resolve_target(HEAD).unwrap(),
            c1
        );
        // Commit, tree and blob all arrived.
        let tree = remote.objects.read_commit(&c1).unwrap().tree;
        let blob = remote.objects.read_tree(&tree).unwrap().entries()[0].object_id;
        assert_eq!(remote.objects.read_blob(&blob).unwrap().data, b"one");
    }

    #[tokio::test]
    async fn fast_forward_then_up_to_date() {
        let (local, remote) = (repo(), repo());
        let c1 = commit(&local, b"one", None);
        let transport = LocalRemote::new(local.clone(), remote);
        transport.push("refs/heads/main").await.unwrap();

        let c2 = commit(&local, b"two", Some(c1));
        assert_eq!(
            transport.push("refs/heads/main").await.unwrap(),
            PushStatus::Updated { old: Some(c1), new: c2 }
        );
        assert!(transport.push("refs/heads/main").await.unwrap().is_up_to_date());
    }

    #[tokio::test]
    async fn diverged_remote_is_rejected() {
        let (a, b, remote) = (repo(), repo(), repo());
        commit(&a, b"from a", None);
        commit(&b, b"from b", None);
        let push_a = LocalRemote::new(a, remote.clone());
        let push_b = LocalRemote::new(b, remote);

        push_a.push("refs/heads/main").await.unwrap();
        assert!(matches!(
            push_b.push("refs/heads/main").await,
            Err(SyncError::NonFastForward { .. })
        ));
    }

    #[tokio::test]
    async fn push_from_unborn_branch_fails() {
        let transport = LocalRemote::new(repo(), repo());
        assert!(matches!(
            transport.push("refs/heads/main").await,
            Err(SyncError::NothingToPush(_))
        ));
    }

    #[tokio::test]
    async fn fetch_copies_history() {
        let (origin, clone) = (repo(), repo());
        let c1 = commit(&origin, b"one", None);
        let c2 = commit(&origin, b"two", Some(c1));
        let transport = LocalRemote::new(clone.clone(), origin);

        assert_eq!(transport.fetch("refs/heads/main").await.unwrap(), Some(c2));
        assert!(clone.objects.exists(&c1).unwrap());
        assert!(is_ancestor(clone.objects.as_ref(), c1, c2).unwrap());
        assert!(!is_ancestor(clone.objects.as_ref(), c2, c1).unwrap());
        // Fetch leaves local refs alone.
        assert!(RefUpdater::new(clone.refs.as_ref()).resolve(HEAD).unwrap().is_unborn());
    }

    #[tokio::test]
    async fn fetch_of_unborn_remote_is_none() {
        let transport = LocalRemote::new(repo(), repo());
        assert_eq!(transport.fetch("refs/heads/main").await.unwrap(), None);
    }
}
