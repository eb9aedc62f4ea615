//! In-memory reference store for tests and ephemeral repositories.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::Ref;

/// An in-memory implementation of [`RefStore`].
///
/// All refs live in a `BTreeMap` behind a `RwLock`. Data is lost when the
/// store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, Ref>>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(|_| RefError::LockPoisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        if let Ref::Symbolic(target) = reference {
            validate_ref_name(target)?;
        }
        let mut refs = self.refs.write().map_err(|_| RefError::LockPoisoned)?;
        refs.insert(name.to_string(), reference.clone());
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut refs = self.refs.write().map_err(|_| RefError::LockPoisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let refs = self.refs.read().map_err(|_| RefError::LockPoisoned)?;
        Ok(refs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HEAD;
    use gitfile_types::ObjectId;

    #[test]
    fn write_and_read_direct_ref() {
        let store = InMemoryRefStore::new();
        let id = ObjectId::from_bytes(b"commit");
        store.write_ref("refs/heads/main", &Ref::Direct(id)).unwrap();
        assert_eq!(store.read_ref("refs/heads/main").unwrap(), Some(Ref::Direct(id)));
    }

    #[test]
    fn read_missing_is_none() {
        let store = InMemoryRefStore::new();
        assert!(store.read_ref("refs/heads/nope").unwrap().is_none());
        assert!(store.head().unwrap().is_none());
    }

    #[test]
    fn overwrite_replaces_value() {
        let store = InMemoryRefStore::new();
        let a = ObjectId::from_bytes(b"a");
        let b = ObjectId::from_bytes(b"b");
        store.write_ref("refs/heads/main", &Ref::Direct(a)).unwrap();
        store.write_ref("refs/heads/main", &Ref::Direct(b)).unwrap();
        assert_eq!(store.read_ref("refs/heads/main").unwrap(), Some(Ref::Direct(b)));
    }

    #[test]
    fn invalid_names_rejected() {
        let store = InMemoryRefStore::new();
        let id = ObjectId::from_bytes(b"a");
        assert!(store.write_ref("main", &Ref::Direct(id)).is_err());
        assert!(store.write_ref(HEAD, &Ref::Symbolic("heads/main".into())).is_err());
    }

    #[test]
    fn delete_and_list() {
        let store = InMemoryRefStore::new();
        let id = ObjectId::from_bytes(b"a");
        store.write_ref("refs/heads/b", &Ref::Direct(id)).unwrap();
        store.write_ref("refs/heads/a", &Ref::Direct(id)).unwrap();
        store.write_ref(HEAD, &Ref::Symbolic("refs/heads/a".into())).unwrap();

        let names: Vec<String> = store
            .list_refs("refs/heads/")
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, ["refs/heads/a", "refs/heads/b"]);

        assert!(store.delete_ref("refs/heads/b").unwrap());
        assert!(!store.delete_ref("refs/heads/b").unwrap());
        assert_eq!(store.list_refs("").unwrap().len(), 2);
    }
}
