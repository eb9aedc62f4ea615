use gitfile_store::{EntryMode, ObjectStore, Tree, TreeEntry};
use gitfile_types::{ObjectId, RepoPath};
use tracing::debug;

use crate::error::{TreeError, TreeResult};

/// How a walk treats directories missing along the path.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Missing {
    /// Start a fresh empty tree (upsert).
    Create,
    /// The path does not exist (lookup, remove).
    NotFound,
}

/// The chain of trees from the root down to the directory holding the leaf.
///
/// `ancestors[i]` is the tree containing `path.segments()[i]`; `leaf` is the
/// tree containing the file name.
struct Spine {
    ancestors: Vec<Tree>,
    leaf: Tree,
}

/// Rewrites a tree to insert, replace or remove one file.
///
/// The walk is iterative over the path segments: trees are loaded root to
/// leaf, the leaf directory is edited, and hashes are then propagated leaf to
/// root, writing one new tree object per level.
pub struct TreeMutator<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> TreeMutator<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Store the empty tree and return its ID (the root of an empty repository).
    pub fn empty_root(&self) -> TreeResult<ObjectId> {
        Ok(self.store.write_tree(&Tree::empty())?)
    }

    /// Point `path` at `blob`, creating intermediate directories as needed.
    ///
    /// An existing file is overwritten in place and keeps its mode; a new
    /// file is `Regular`. Fails with `PathConflict` if the leaf names a
    /// directory or any ancestor names a file.
    pub fn upsert(&self, root: &ObjectId, path: &RepoPath, blob: ObjectId) -> TreeResult<ObjectId> {
        let mut spine = self.load_spine(root, path, Missing::Create)?;

        let name = path.file_name();
        let mode = match spine.leaf.get(name) {
            Some(existing) if existing.mode.is_dir() => {
                return Err(TreeError::PathConflict {
                    path: path.to_string(),
                    reason: "destination is a directory".into(),
                });
            }
            Some(existing) => existing.mode,
            None => EntryMode::Regular,
        };
        spine.leaf.upsert(TreeEntry::new(mode, name, blob));

        let new_root = self.write_spine(spine, path)?;
        debug!(%path, root = %new_root.short_hex(), "tree upsert");
        Ok(new_root)
    }

    /// Drop the file at `path`.
    ///
    /// Directories left empty by the removal stay in place as empty trees.
    pub fn remove(&self, root: &ObjectId, path: &RepoPath) -> TreeResult<ObjectId> {
        let mut spine = self.load_spine(root, path, Missing::NotFound)?;

        match spine.leaf.get(path.file_name()) {
            Some(entry) if !entry.mode.is_dir() => {
                spine.leaf.remove(path.file_name());
            }
            _ => return Err(TreeError::PathNotFound(path.to_string())),
        }

        let new_root = self.write_spine(spine, path)?;
        debug!(%path, root = %new_root.short_hex(), "tree remove");
        Ok(new_root)
    }

    /// Resolve `path` to the blob it names.
    pub fn lookup(&self, root: &ObjectId, path: &RepoPath) -> TreeResult<ObjectId> {
        let spine = self.load_spine(root, path, Missing::NotFound)?;
        match spine.leaf.get(path.file_name()) {
            Some(entry) if !entry.mode.is_dir() => Ok(entry.object_id),
            _ => Err(TreeError::PathNotFound(path.to_string())),
        }
    }

    fn load_spine(&self, root: &ObjectId, path: &RepoPath, missing: Missing) -> TreeResult<Spine> {
        let mut ancestors = Vec::with_capacity(path.depth() - 1);
        let mut current = self.store.read_tree(root)?;

        for (depth, name) in path.parents().iter().enumerate() {
            let next = match current.get(name) {
                Some(entry) if entry.mode.is_dir() => self.store.read_tree(&entry.object_id)?,
                Some(_) if missing == Missing::Create => {
                    return Err(TreeError::PathConflict {
                        path: path.segments()[..=depth].join("/"),
                        reason: "expected a directory, found a file".into(),
                    });
                }
                None if missing == Missing::Create => Tree::empty(),
                _ => return Err(TreeError::PathNotFound(path.to_string())),
            };
            ancestors.push(std::mem::replace(&mut current, next));
        }

        Ok(Spine {
            ancestors,
            leaf: current,
        })
    }

    fn write_spine(&self, spine: Spine, path: &RepoPath) -> TreeResult<ObjectId> {
        let mut child = self.store.write_tree(&spine.leaf)?;
        for (mut tree, name) in spine.ancestors.into_iter().rev().zip(path.parents().iter().rev()) {
            tree.upsert(TreeEntry::directory(name.as_str(), child));
            child = self.store.write_tree(&tree)?;
        }
        Ok(child)
    }
}
