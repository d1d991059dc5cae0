//! Shared type definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of an extension
///
/// Ids double as directory names under the extensions directory, so they
/// never contain path separators, never start with `.` (hidden entries are
/// reserved for staging and journal data) and are never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtensionId(String);

impl ExtensionId {
    /// Validate and wrap an identifier
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(Error::invalid_extension_id(id, "must not be empty"));
        }
        if id.trim() != id {
            return Err(Error::invalid_extension_id(
                id,
                "must not have surrounding whitespace",
            ));
        }
        if id.starts_with('.') {
            return Err(Error::invalid_extension_id(id, "must not start with '.'"));
        }
        if id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(Error::invalid_extension_id(
                id,
                "must not contain path separators or '..'",
            ));
        }
        if id.chars().any(char::is_control) {
            return Err(Error::invalid_extension_id(
                id,
                "must not contain control characters",
            ));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExtensionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ExtensionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ExtensionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ExtensionId> for String {
    fn from(id: ExtensionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        for id in ["com.github.user.repo", "local.my-ext", "a", "ext_1"] {
            assert_eq!(ExtensionId::new(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(ExtensionId::new("").is_err());
        assert!(ExtensionId::new("   ").is_err());
        assert!(ExtensionId::new(" padded ").is_err());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        assert!(ExtensionId::new("a/b").is_err());
        assert!(ExtensionId::new("a\\b").is_err());
        assert!(ExtensionId::new("..").is_err());
        assert!(ExtensionId::new("x..y").is_err());
        assert!(ExtensionId::new(".staging").is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![
            ExtensionId::new("c").unwrap(),
            ExtensionId::new("a").unwrap(),
            ExtensionId::new("b").unwrap(),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_serde_is_transparent_and_validating() {
        let id = ExtensionId::new("com.github.user.repo").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"com.github.user.repo\"");

        let back: ExtensionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<ExtensionId>("\"\"").is_err());
    }
}
