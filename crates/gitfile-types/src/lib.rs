//! Foundation types for gitfile.
//!
//! This crate provides the identifiers and value types shared by every other
//! gitfile crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`RepoPath`] -- Validated `/`-separated path inside a repository tree
//! - [`Signature`] -- Author/committer identity with a timestamp

pub mod error;
pub mod object;
pub mod path;
pub mod signature;

pub use error::TypeError;
pub use object::ObjectId;
pub use path::RepoPath;
pub use signature::Signature;
