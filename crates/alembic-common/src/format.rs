//! Normalized file format identifiers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

/// Normalized identifier for a file format.
///
/// Tokens are always lowercase with no leading dot, so comparison and lookup
/// are case-insensitive by construction: `"PDF"`, `".pdf"` and `"pdf"` all
/// normalize to the same token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FormatToken(String);

impl FormatToken {
    /// Build a token from raw user input, normalizing to canonical form.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().trim_start_matches('.').to_ascii_lowercase())
    }

    /// The canonical lowercase form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token for a path's extension, if it has one.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).map(Self::new)
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FormatToken {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// Manual impl so deserialized tokens are normalized too.
impl<'de> Deserialize<'de> for FormatToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_leading_dot() {
        assert_eq!(FormatToken::new("PDF").as_str(), "pdf");
        assert_eq!(FormatToken::new(".JpEg").as_str(), "jpeg");
        assert_eq!(FormatToken::new("  png "), FormatToken::new("png"));
    }

    #[test]
    fn from_path_uses_extension() {
        assert_eq!(
            FormatToken::from_path(Path::new("/tmp/report.PDF")),
            Some(FormatToken::new("pdf"))
        );
        assert_eq!(FormatToken::from_path(Path::new("/tmp/noext")), None);
    }
}
