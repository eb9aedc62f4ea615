//! Repository-relative paths.
//!
//! A [`RepoPath`] is a non-empty sequence of name segments joined by `/`.
//! Empty segments (leading, trailing or doubled separators) and the
//! relative segments `.` and `..` are rejected at parse time, so every
//! `RepoPath` maps onto exactly one chain of tree entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The path separator used inside trees.
pub const SEPARATOR: char = '/';

/// A validated, non-empty path inside a repository tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath {
    segments: Vec<String>,
}

impl RepoPath {
    /// Parse a `/`-separated path.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("path must not be empty"));
        }

        let mut segments = Vec::new();
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" => return Err(invalid("path must not contain empty segments")),
                "." | ".." => return Err(invalid("path must not contain relative segments")),
                s if s.contains('\0') => return Err(invalid("path must not contain NUL")),
                s => segments.push(s.to_string()),
            }
        }

        Ok(Self { segments })
    }

    /// All segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (always at least 1).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The final segment (the file name).
    pub fn file_name(&self) -> &str {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    /// Segments naming the directories above the file, root first.
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for RepoPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.to_string()
    }
}
