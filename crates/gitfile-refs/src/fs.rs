//! On-disk reference store using git's loose-ref layout.
//!
//! Each ref is a file under the repository directory named after the ref
//! (`HEAD`, `refs/heads/main`) containing either `ref: <target>` or a hex
//! commit ID, followed by a newline. Updates go through a temporary file
//! renamed over the old one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use gitfile_types::ObjectId;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::Ref;

/// Filesystem-backed [`RefStore`].
#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// Open (or create) a ref directory rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.root.clone(), |p, c| p.join(c))
    }

    fn parse(name: &str, contents: &str) -> Result<Ref> {
        let contents = contents.trim_end();
        if let Some(target) = contents.strip_prefix("ref: ") {
            return Ok(Ref::Symbolic(target.to_string()));
        }
        contents
            .parse::<ObjectId>()
            .map(Ref::Direct)
            .map_err(|e| RefError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<(String, Ref)>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let name = if prefix.is_empty() {
                file_name.to_string()
            } else {
                format!("{prefix}/{file_name}")
            };
            if entry.file_type()?.is_dir() {
                // Nested refs only live under `refs/`; skip siblings like `objects/`.
                if prefix.is_empty() && file_name != "refs" {
                    continue;
                }
                self.collect(&entry.path(), &name, out)?;
            } else if validate_ref_name(&name).is_ok() {
                if let Some(r) = self.read_ref(&name)? {
                    out.push((name, r));
                }
            }
        }
        Ok(())
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        validate_ref_name(name)?;
        match fs::read_to_string(self.ref_path(name)) {
            Ok(contents) => Self::parse(name, &contents).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        validate_ref_name(name)?;
        if let Ref::Symbolic(target) = reference {
            validate_ref_name(target)?;
        }
        let path = self.ref_path(name);
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{reference}")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| RefError::Io(e.error))?;

        debug!(name, value = %reference, "ref written");
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        validate_ref_name(name)?;
        match fs::remove_file(self.ref_path(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let mut out = Vec::new();
        self.collect(&self.root, "", &mut out)?;
        out.retain(|(name, _)| name.starts_with(prefix));
        out.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(out)
    }
}
