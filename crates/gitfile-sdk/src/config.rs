use std::path::{Path, PathBuf};
use std::time::Duration;

use gitfile_refs::names::validate_branch_name;
use gitfile_sync::CoordinatorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};
use crate::repository::Identity;

/// Environment variable consulted when the config omits `repository_url`.
pub const REPOSITORY_URL_ENV: &str = "GIT_REPOSITORY_URL";

/// Settings for a file service bound to one remote branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Location of the remote repository: a directory path or `file://` URL.
    pub repository_url: Option<String>,
    pub branch: String,
    pub author_name: String,
    pub author_email: String,
    /// Directory for the local clone. Kept in memory when unset.
    pub work_dir: Option<PathBuf>,
    /// Upper bound on how long a publish batch waits for a straggler.
    pub submit_timeout_ms: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            repository_url: None,
            branch: "main".into(),
            author_name: "Git File Provider".into(),
            author_email: "gitfile@localhost".into(),
            work_dir: None,
            submit_timeout_ms: None,
        }
    }
}

impl ProviderConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Load a TOML file, filling `repository_url` from the environment
    /// when the file leaves it out.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::from_toml_str(&raw)?.with_env())
    }

    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Like [`with_env`](Self::with_env) with an explicit variable lookup.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.repository_url.is_none() {
            self.repository_url = lookup(REPOSITORY_URL_ENV).filter(|url| !url.is_empty());
        }
        self
    }

    pub fn validate(&self) -> SdkResult<()> {
        self.repository_url()?;
        validate_branch_name(&self.branch).map_err(|e| SdkError::Config(e.to_string()))?;
        if self.author_name.trim().is_empty() {
            return Err(SdkError::Config("author_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn repository_url(&self) -> SdkResult<&str> {
        match self.repository_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(SdkError::Config(format!(
                "repository_url is not set and {REPOSITORY_URL_ENV} is empty"
            ))),
        }
    }

    /// The remote repository directory named by `repository_url`.
    pub fn remote_dir(&self) -> SdkResult<PathBuf> {
        let url = self.repository_url()?;
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if let Some((scheme, _)) = url.split_once("://") {
            return Err(SdkError::Config(format!(
                "unsupported repository scheme {scheme:?}, only local repositories are supported"
            )));
        }
        Ok(PathBuf::from(url))
    }

    pub fn identity(&self) -> Identity {
        Identity::new(&self.author_name, &self.author_email)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            submit_timeout: self.submit_timeout_ms.map(Duration::from_millis),
        }
    }
}
