use gitfile_store::{Commit, ObjectStore};
use gitfile_types::{ObjectId, Signature};

use crate::error::SdkResult;

/// Assembles a [`Commit`] from a tree, an optional parent, identities and a
/// message.
///
/// Construction is pure: identical inputs (timestamps included) always
/// produce an identical commit and therefore an identical ID.
#[derive(Clone, Debug)]
pub struct CommitBuilder {
    tree: ObjectId,
    parent: Option<ObjectId>,
    author: Signature,
    committer: Option<Signature>,
    message: String,
}

impl CommitBuilder {
    pub fn new(tree: ObjectId, author: Signature, message: impl Into<String>) -> Self {
        Self {
            tree,
            parent: None,
            author,
            committer: None,
            message: message.into(),
        }
    }

    /// Chain onto `parent`. `None` starts a new history.
    pub fn with_parent(mut self, parent: Option<ObjectId>) -> Self {
        self.parent = parent;
        self
    }

    /// Defaults to the author.
    pub fn with_committer(mut self, committer: Signature) -> Self {
        self.committer = Some(committer);
        self
    }

    pub fn build(self) -> Commit {
        let committer = self.committer.unwrap_or_else(|| self.author.clone());
        Commit {
            tree: self.tree,
            parents: self.parent.into_iter().collect(),
            author: self.author,
            committer,
            message: self.message,
        }
    }

    /// Build and write the commit, returning its ID.
    pub fn store(self, store: &dyn ObjectStore) -> SdkResult<ObjectId> {
        Ok(store.write_commit(&self.build())?)
    }
}
