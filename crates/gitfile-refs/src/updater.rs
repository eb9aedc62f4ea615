//! Symbolic-ref resolution and branch advancement.

use gitfile_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::traits::RefStore;
use crate::types::Ref;

/// Maximum number of symbolic hops followed before giving up.
pub const MAX_SYMBOLIC_DEPTH: usize = 5;

/// The outcome of resolving a ref name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// The direct ref slot the name ultimately designates
    /// (`refs/heads/main` when resolving `HEAD`).
    pub slot: String,
    /// The commit in that slot, or `None` if the branch is unborn.
    pub target: Option<ObjectId>,
}

impl Resolved {
    pub fn is_unborn(&self) -> bool {
        self.target.is_none()
    }
}

/// Reads and moves refs on top of a [`RefStore`].
///
/// The updater performs no compare-and-swap. Callers advancing a branch must
/// hold whatever lock serializes commits on that repository.
pub struct RefUpdater<'a> {
    refs: &'a dyn RefStore,
}

impl<'a> RefUpdater<'a> {
    pub fn new(refs: &'a dyn RefStore) -> Self {
        Self { refs }
    }

    /// Follow symbolic refs from `name` to a direct slot.
    ///
    /// A missing ref at the end of the chain is an unborn branch, not an
    /// error. A missing ref at the start (`name` itself) is also treated as
    /// unborn in its own slot.
    pub fn resolve(&self, name: &str) -> Result<Resolved> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMBOLIC_DEPTH {
            match self.refs.read_ref(&current)? {
                None => {
                    return Ok(Resolved {
                        slot: current,
                        target: None,
                    })
                }
                Some(Ref::Direct(id)) => {
                    return Ok(Resolved {
                        slot: current,
                        target: Some(id),
                    })
                }
                Some(Ref::Symbolic(next)) => current = next,
            }
        }
        Err(RefError::SymbolicLoop {
            name: name.to_string(),
            depth: MAX_SYMBOLIC_DEPTH,
        })
    }

    /// Resolve `name` and require a commit behind it.
    pub fn resolve_target(&self, name: &str) -> Result<ObjectId> {
        self.resolve(name)?.target.ok_or_else(|| RefError::NotFound {
            name: name.to_string(),
        })
    }

    /// Point the slot `name` resolves to at `commit`. Returns the slot name.
    ///
    /// Advancing `HEAD` on an unborn branch creates the branch ref.
    pub fn advance(&self, name: &str, commit: ObjectId) -> Result<String> {
        let resolved = self.resolve(name)?;
        self.refs.write_ref(&resolved.slot, &Ref::Direct(commit))?;
        debug!(
            name,
            slot = %resolved.slot,
            from = ?resolved.target.map(|id| id.short_hex()),
            to = %commit.short_hex(),
            "ref advanced"
        );
        Ok(resolved.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRefStore;
    use crate::types::HEAD;

    fn repo_refs() -> InMemoryRefStore {
        let refs = InMemoryRefStore::new();
        refs.write_ref(HEAD, &Ref::Symbolic("refs/heads/main".into()))
            .unwrap();
        refs
    }

    #[test]
    fn unborn_branch_resolves_without_target() {
        let refs = repo_refs();
        let resolved = RefUpdater::new(&refs).resolve(HEAD).unwrap();
        assert_eq!(resolved.slot, "refs/heads/main");
        assert!(resolved.is_unborn());
    }

    #[test]
    fn advance_creates_then_moves_branch() {
        let refs = repo_refs();
        let updater = RefUpdater::new(&refs);
        let c1 = ObjectId::from_bytes(b"c1");
        let c2 = ObjectId::from_bytes(b"c2");

        assert_eq!(updater.advance(HEAD, c1).unwrap(), "refs/heads/main");
        assert_eq!(updater.resolve_target(HEAD).unwrap(), c1);

        updater.advance(HEAD, c2).unwrap();
        assert_eq!(updater.resolve_target(HEAD).unwrap(), c2);
        // HEAD itself stays symbolic.
        assert!(refs.head().unwrap().unwrap().is_symbolic());
    }

    #[test]
    fn resolve_target_on_unborn_is_not_found() {
        let refs = repo_refs();
        assert!(matches!(
            RefUpdater::new(&refs).resolve_target(HEAD),
            Err(RefError::NotFound { .. })
        ));
    }

    #[test]
    fn follows_chained_symbolic_refs() {
        let refs = repo_refs();
        let id = ObjectId::from_bytes(b"c");
        refs.write_ref("refs/heads/main", &Ref::Symbolic("refs/heads/trunk".into()))
            .unwrap();
        refs.write_ref("refs/heads/trunk", &Ref::Direct(id)).unwrap();

        let resolved = RefUpdater::new(&refs).resolve(HEAD).unwrap();
        assert_eq!(resolved.slot, "refs/heads/trunk");
        assert_eq!(resolved.target, Some(id));
    }

    #[test]
    fn symbolic_cycle_is_detected() {
        let refs = InMemoryRefStore::new();
        refs.write_ref("refs/heads/a", &Ref::Symbolic("refs/heads/b".into()))
            .unwrap();
        refs.write_ref("refs/heads/b", &Ref::Symbolic("refs/heads/a".into()))
            .unwrap();
        assert!(matches!(
            RefUpdater::new(&refs).resolve("refs/heads/a"),
            Err(RefError::SymbolicLoop { depth: MAX_SYMBOLIC_DEPTH, .. })
        ));
    }
}
