//! Ref name validation following git-style conventions.
//!
//! A valid ref name is either `HEAD` or `refs/<component>/...` where every
//! component is non-empty, does not start with `.`, and the name as a whole
//! contains no whitespace, `~^:?*[\`, `..`, `@{`, and does not end with `.`,
//! `/` or `.lock`.

use crate::error::{RefError, Result};
use crate::types::HEAD;

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Substrings that are forbidden anywhere in a ref name.
const FORBIDDEN_SEQUENCES: &[&str] = &["..", "@{", "//"];

/// Validate a short branch name such as `main` or `feature/auth`.
///
/// # Examples
///
/// ```
/// use gitfile_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty".into()));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Err(invalid(format!("contains forbidden character {ch:?}")));
    }
    if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| name.contains(*s)) {
        return Err(invalid(format!("must not contain {seq:?}")));
    }
    if name.ends_with('.') || name.ends_with('/') || name.ends_with(".lock") {
        return Err(invalid("must not end with '.', '/' or '.lock'".into()));
    }
    for component in name.split('/') {
        if component.is_empty() || component.starts_with('.') {
            return Err(invalid(format!("invalid component {component:?}")));
        }
    }
    Ok(())
}

/// Validate a full ref name: `HEAD` or `refs/...`.
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name == HEAD {
        return Ok(());
    }
    match name.strip_prefix("refs/") {
        Some(rest) => validate_branch_name(rest).map_err(|e| match e {
            RefError::InvalidName { reason, .. } => RefError::InvalidName {
                name: name.to_string(),
                reason,
            },
            other => other,
        }),
        None => Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "must be HEAD or start with 'refs/'".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_branch_names() {
        for name in ["main", "my-branch", "v1.0", "feature/auth", "user/alice/fix-123"] {
            assert!(validate_branch_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn invalid_branch_names() {
        for name in [
            "",
            "bad..name",
            "has space",
            "has\ttab",
            "a~b",
            "a^b",
            "a:b",
            "a?b",
            "a*b",
            "a[b",
            "a\\b",
            ".hidden",
            "trailing.",
            "/leading",
            "trailing/",
            "a//b",
            "main.lock",
            "ref@{0}",
            "feature/.hidden",
        ] {
            assert!(validate_branch_name(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn full_ref_names() {
        assert!(validate_ref_name("HEAD").is_ok());
        assert!(validate_ref_name("refs/heads/main").is_ok());
        assert!(validate_ref_name("main").is_err());
        assert!(validate_ref_name("refs/").is_err());
        assert!(validate_ref_name("refs/heads/..").is_err());
    }

    #[test]
    fn error_names_full_ref() {
        match validate_ref_name("refs/heads/a b").unwrap_err() {
            RefError::InvalidName { name, .. } => assert_eq!(name, "refs/heads/a b"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
