//! Form engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Behavior switches for one form.
///
/// Every field has a default, so a partial TOML or JSON document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Schedule a debounced validation after every change.
    pub validate_on_change: bool,

    /// Validate a field when it loses focus.
    pub validate_on_blur: bool,

    /// Validate every registered field before calling the submit handler.
    pub validate_on_submit: bool,

    /// Treat `.` in field names as nesting. When off, names are flat keys.
    pub allow_nested_fields: bool,

    /// Debounce delay in milliseconds.
    ///
    /// Each change to a field restarts that field's timer.
    pub debounce_ms: u64,

    /// Trim text input on change.
    pub trim_string_values: bool,

    /// Trim the stored string when a field loses focus.
    pub auto_trim_on_blur: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            validate_on_change: true,
            validate_on_blur: true,
            validate_on_submit: true,
            allow_nested_fields: true,
            debounce_ms: 300,
            trim_string_values: true,
            auto_trim_on_blur: true,
        }
    }
}

impl FormConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// The debounce delay.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn with_validate_on_change(mut self, enable: bool) -> Self {
        self.validate_on_change = enable;
        self
    }

    #[must_use]
    pub fn with_validate_on_blur(mut self, enable: bool) -> Self {
        self.validate_on_blur = enable;
        self
    }

    #[must_use]
    pub fn with_validate_on_submit(mut self, enable: bool) -> Self {
        self.validate_on_submit = enable;
        self
    }

    #[must_use]
    pub fn with_nested_fields(mut self, enable: bool) -> Self {
        self.allow_nested_fields = enable;
        self
    }

    /// Set the debounce delay in milliseconds.
    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    #[must_use]
    pub fn with_trim_string_values(mut self, enable: bool) -> Self {
        self.trim_string_values = enable;
        self
    }

    #[must_use]
    pub fn with_auto_trim_on_blur(mut self, enable: bool) -> Self {
        self.auto_trim_on_blur = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FormConfig::default();
        assert!(config.validate_on_change);
        assert!(config.allow_nested_fields);
        assert_eq!(config.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FormConfig::from_toml_str("debounce_ms = 50\nallow_nested_fields = false\n")
            .unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert!(!config.allow_nested_fields);
        assert!(config.validate_on_blur);
    }

    #[test]
    fn test_invalid_toml() {
        let err = FormConfig::from_toml_str("debounce_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, crate::FormError::Config { .. }));
    }
}
