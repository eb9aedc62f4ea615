//! The [`RefStore`] trait defining the reference storage interface.

use crate::error::Result;
use crate::types::{Ref, HEAD};

/// Storage backend for named references.
///
/// Implementations must be thread-safe and make each single-ref write
/// atomic: a reader sees either the old or the new value, never a mix.
/// There is no compare-and-swap; writers that need read-modify-write
/// semantics must serialize among themselves.
pub trait RefStore: Send + Sync {
    /// Read a ref by name (`HEAD`, `refs/heads/main`, ...).
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Create or overwrite a ref.
    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Delete a ref. Returns `Ok(true)` if it existed.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// Read HEAD.
    fn head(&self) -> Result<Option<Ref>> {
        self.read_ref(HEAD)
    }
}
