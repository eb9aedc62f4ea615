//! Path-level mutation of content-addressed trees.
//!
//! [`TreeMutator`] inserts, replaces, looks up or removes a single file at
//! an arbitrary [`RepoPath`](gitfile_types::RepoPath) below a root tree. A
//! mutation never touches existing objects: every tree on the path from the
//! changed entry up to the root is re-encoded, hashed and written as a new
//! object, and the new root ID is returned. Sibling subtrees are shared
//! unchanged between the old and new roots.

pub mod error;
pub mod mutator;

pub use error::{TreeError, TreeResult};
pub use mutator::TreeMutator;
