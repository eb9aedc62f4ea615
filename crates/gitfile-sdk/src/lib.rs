//! High-level API for gitfile.
//!
//! A [`Repository`] is one locked session over an object store and a ref
//! store: every file change is read-mutate-commit-advance under a single
//! lock. A [`FileService`] adds publishing: after each local commit the
//! lock is released and the commit joins the next batched push through a
//! [`PublishCoordinator`](gitfile_sync::PublishCoordinator).
//!
//! [`FileResource`] and [`FileDataSource`] adapt the service to hosts that
//! speak in flat string attribute bags, and [`ProviderConfig`] wires
//! everything up from a TOML file.
//!
//! # Example
//!
//! ```
//! use gitfile_sdk::{Identity, Repository};
//! use gitfile_types::RepoPath;
//!
//! let repo = Repository::in_memory(Identity::new("Ada", "ada@example.com")).unwrap();
//! let path = RepoPath::parse("docs/readme.md").unwrap();
//! repo.write_file(&path, b"hello").unwrap();
//! assert_eq!(repo.read_file(&path).unwrap().data, b"hello");
//! ```

pub mod commit;
pub mod config;
pub mod error;
pub mod repository;
pub mod resource;
pub mod service;

pub use commit::CommitBuilder;
pub use config::ProviderConfig;
pub use error::{SdkError, SdkResult};
pub use repository::{open_dir, FileChange, FileContents, Identity, LogEntry, Repository};
pub use resource::{FileDataSource, FileResource, ResourceData};
pub use service::{FileService, PendingPublish};
