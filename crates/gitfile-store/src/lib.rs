//! Content-addressed object storage for gitfile.
//!
//! Every piece of repository data -- file contents, directory listings,
//! commits -- is an immutable object identified by the BLAKE3 hash of its
//! encoded bytes (domain-separated by object kind).
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- canonically sorted directory listing
//! - [`Commit`] -- tree + parents + identities + message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- loose objects under a directory, one file per object
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; a change always produces a new object.
//! 2. Writes are idempotent: storing identical bytes twice yields one object.
//! 3. Write-then-link: objects are stored before any reference points at them.
//! 4. The store never interprets object contents.

pub mod error;
pub mod fs;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryKind, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
