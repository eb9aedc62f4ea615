//! Core reference types.

use std::fmt;

use gitfile_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Name of the ref that selects the current branch.
pub const HEAD: &str = "HEAD";

/// Canonical name of a local branch (`main` -> `refs/heads/main`).
pub fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

/// A stored reference value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    /// Points directly at a commit.
    Direct(ObjectId),
    /// Names another ref.
    Symbolic(String),
}

impl Ref {
    /// The commit ID for direct refs.
    pub fn target_id(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct(id) => Some(*id),
            Ref::Symbolic(_) => None,
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic(_))
    }
}

impl fmt::Display for Ref {
    /// Git's on-disk format: `ref: <name>` or the hex ID.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Direct(id) => write!(f, "{id}"),
            Ref::Symbolic(name) => write!(f, "ref: {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_ref_name() {
        assert_eq!(branch_ref("main"), "refs/heads/main");
    }

    #[test]
    fn display_formats() {
        let id = ObjectId::from_bytes(b"c");
        assert_eq!(Ref::Direct(id).to_string(), id.to_hex());
        assert_eq!(
            Ref::Symbolic("refs/heads/main".into()).to_string(),
            "ref: refs/heads/main"
        );
    }

    #[test]
    fn target_id_only_for_direct() {
        let id = ObjectId::from_bytes(b"c");
        assert_eq!(Ref::Direct(id).target_id(), Some(id));
        assert_eq!(Ref::Symbolic("x".into()).target_id(), None);
        assert!(Ref::Symbolic("x".into()).is_symbolic());
    }
}
