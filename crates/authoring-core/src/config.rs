//! Session configuration.

use crate::document::{InlineStyle, StyleSet};
use crate::error::InterchangeError;
use serde::{Deserialize, Serialize};

/// Editor session settings.
///
/// Every field has a default, so a partial (or empty) JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Acting identity stamped on highlights and resolutions.
    pub author: String,
    /// Maximum undo depth.
    pub max_undo: usize,
    /// Styles the editor allows; pasted content is filtered down to these and
    /// formatting with any other style is rejected.
    pub allowed_styles: StyleSet,
    /// Default case sensitivity for find/replace.
    pub search_case_sensitive: bool,
    /// Debounce window for spellcheck lookups, in milliseconds.
    pub spellcheck_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            author: "anonymous".to_string(),
            max_undo: 1000,
            allowed_styles: InlineStyle::ALL.iter().copied().collect(),
            search_case_sensitive: false,
            spellcheck_debounce_ms: 500,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, InterchangeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder: set the acting identity.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"author": "desk", "allowedStyles": ["BOLD", "ITALIC"]}"#).unwrap();
        assert_eq!(config.author, "desk");
        assert_eq!(config.max_undo, 1000);
        assert_eq!(config.allowed_styles.len(), 2);
        assert!(config.allowed_styles.contains(&InlineStyle::Bold));
        assert_eq!(config.spellcheck_debounce_ms, 500);
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
        assert!(EditorConfig::from_json("[]").is_err());
    }
}
