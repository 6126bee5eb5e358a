//! Graph configuration.
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! indent_width = 4
//! trace_notifications = true
//! rollback_flags_on_read_error = false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GraphConfig {
    /// Spaces per indentation level in text output.
    pub indent_width: usize,
    /// Log every completed notification pass at debug level.
    pub trace_notifications: bool,
    /// Restore the default/dirty flags of a field when reading its value fails.
    ///
    /// Off by default: a failed read leaves both flags cleared even though the
    /// value itself is untouched.
    pub rollback_flags_on_read_error: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            trace_notifications: false,
            rollback_flags_on_read_error: false,
        }
    }
}

impl GraphConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, FieldError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FieldError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GraphConfig::from_toml_str("").unwrap();
        assert_eq!(config, GraphConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = GraphConfig::from_toml_str("indent_width = 4\nrollback_flags_on_read_error = true").unwrap();
        assert_eq!(config.indent_width, 4);
        assert!(config.rollback_flags_on_read_error);
        assert!(!config.trace_notifications);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let result = GraphConfig::from_toml_str("indent_width = \"wide\"");
        assert!(matches!(result, Err(FieldError::Config(_))));
    }
}
