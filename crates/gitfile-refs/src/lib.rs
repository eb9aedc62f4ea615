//! Reference management for gitfile.
//!
//! References are the only mutable state in a repository: named pointers
//! into the immutable commit history.
//!
//! - **Direct refs** hold a commit ID (`refs/heads/main` after a commit).
//! - **Symbolic refs** name another ref (`HEAD` -> `refs/heads/main`).
//!
//! A branch that HEAD names but that has no ref yet is *unborn*: the
//! repository is empty and the next commit has no parent.
//!
//! # Modules
//!
//! - [`types`] -- [`Ref`] and well-known names
//! - [`traits`] -- The [`RefStore`] storage interface
//! - [`memory`] / [`fs`] -- In-memory and on-disk stores
//! - [`names`] -- Ref name validation
//! - [`updater`] -- [`RefUpdater`]: symbolic resolution and ref advancement

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;
pub mod updater;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use traits::RefStore;
pub use types::{branch_ref, Ref, HEAD};
pub use updater::{RefUpdater, Resolved};
