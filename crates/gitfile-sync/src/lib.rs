//! Publishing for gitfile.
//!
//! Local commits are cheap and serialized by the repository lock; publishing
//! them to a remote is slow and network-bound. This crate keeps the two
//! apart:
//!
//! - [`PublishCoordinator`] coalesces concurrent publish requests into one
//!   [`Combiner`] invocation per cycle and fans the single outcome back out
//!   to every participant.
//! - [`RemoteTransport`] is the push/fetch interface the combine step drives,
//!   with [`LocalRemote`] as an in-process implementation that enforces
//!   fast-forward-only updates.

pub mod coordinator;
pub mod error;
pub mod local;
pub mod transport;
pub mod types;

pub use coordinator::{
    Combiner, CoordinatorConfig, Phase, PublishCoordinator, ResultHandle, Submitter,
};
pub use error::{PublishError, SyncError, SyncResult};
pub use local::LocalRemote;
pub use transport::RemoteTransport;
pub use types::{PushStatus, RepoHandle};
