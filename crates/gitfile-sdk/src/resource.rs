//! Adapter for hosts that manage files as resources with string attributes.
//!
//! A host hands over a [`ResourceData`] (an optional ID plus a flat
//! attribute map) and expects it back updated: the ID is the hex blob hash
//! of the file's current contents, and `contents` mirrors what is stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use gitfile_types::RepoPath;
use tracing::info;

use crate::error::{SdkError, SdkResult};
use crate::repository::FileContents;
use crate::service::FileService;

pub const PATH: &str = "path";
pub const CONTENTS: &str = "contents";

/// Resource state exchanged with the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceData {
    id: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource describing `path` with `contents`.
    pub fn file(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::new().with(PATH, path).with(CONTENTS, contents)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    fn path(&self) -> SdkResult<RepoPath> {
        let raw = self.get(PATH).ok_or(SdkError::MissingAttribute(PATH))?;
        RepoPath::parse(raw).map_err(|e| SdkError::InvalidAttribute {
            name: PATH,
            reason: e.to_string(),
        })
    }

    fn contents(&self) -> SdkResult<&str> {
        self.get(CONTENTS).ok_or(SdkError::MissingAttribute(CONTENTS))
    }
}

fn fill_from(data: &mut ResourceData, file: FileContents) -> SdkResult<()> {
    let contents = String::from_utf8(file.data).map_err(|e| SdkError::InvalidAttribute {
        name: CONTENTS,
        reason: e.to_string(),
    })?;
    data.set(CONTENTS, contents);
    data.set_id(file.blob.to_hex());
    Ok(())
}

/// Create, read, update and delete files as host resources.
pub struct FileResource {
    service: Arc<FileService>,
}

impl FileResource {
    pub fn new(service: Arc<FileService>) -> Self {
        Self { service }
    }

    /// Write the file, publish it, and refresh the resource from HEAD.
    pub async fn create(&self, data: &mut ResourceData) -> SdkResult<()> {
        let path = data.path()?;
        let contents = data.contents()?.to_owned();
        self.service.write_file(&path, contents.as_bytes()).await?;
        info!(%path, "file resource written");
        self.read(data)
    }

    /// Same as [`create`](Self::create): the write overwrites in place.
    pub async fn update(&self, data: &mut ResourceData) -> SdkResult<()> {
        self.create(data).await
    }

    /// Refresh `contents` and the ID from HEAD.
    ///
    /// A file that no longer exists clears the ID instead of failing, so
    /// the host can tell the resource was removed out of band.
    pub fn read(&self, data: &mut ResourceData) -> SdkResult<()> {
        let path = data.path()?;
        let file = match self.service.read_file(&path) {
            Ok(file) => file,
            Err(SdkError::PathNotFound(_)) => {
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        fill_from(data, file)
    }

    /// Delete the file and publish the removal. Deleting a file that is
    /// already gone succeeds without a commit.
    pub async fn delete(&self, data: &mut ResourceData) -> SdkResult<()> {
        let path = data.path()?;
        match self.service.delete_file(&path).await {
            Ok(_) => info!(%path, "file resource deleted"),
            Err(SdkError::PathNotFound(_)) => info!(%path, "file resource already absent"),
            Err(e) => return Err(e),
        }
        data.clear_id();
        Ok(())
    }
}

/// Read-only lookup of a file by path.
///
/// Unlike [`FileResource::read`], a missing file is an error: the host asked
/// for data that must exist.
pub struct FileDataSource {
    service: Arc<FileService>,
}

impl FileDataSource {
    pub fn new(service: Arc<FileService>) -> Self {
        Self { service }
    }

    /// Fill `contents` and the ID from the file at the `path` attribute.
    pub fn read(&self, data: &mut ResourceData) -> SdkResult<()> {
        let path = data.path()?;
        let file = self.service.read_file(&path)?;
        fill_from(data, file)
    }
}
