//! Engine configuration.
//!
//! Loaded from TOML or built in code; every field has a default so an empty
//! document is a valid configuration.

use serde::Deserialize;
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

pub const DEFAULT_MAX_NORMAL_FORM_CLAUSES: usize = 4096;
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 256;

///
/// ConfigError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// FilterConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Cache parsed filters by `(entity, text)`.
    pub parse_cache: bool,

    /// Largest clause count a normal-form rewrite may produce.
    pub max_normal_form_clauses: usize,

    /// Deepest filter tree, and deepest `!` / `(` nesting, the engine will
    /// build. Every traversal recurses once per level.
    pub max_filter_depth: usize,
}

impl FilterConfig {
    /// Parse a configuration from a TOML document.
    ///
    /// ```toml
    /// parse_cache = true
    /// max_normal_form_clauses = 1024
    /// max_filter_depth = 128
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_normal_form_clauses == 0 {
            return Err(ConfigError::Invalid(
                "max_normal_form_clauses must be at least 1".to_string(),
            ));
        }
        if self.max_filter_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_filter_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            parse_cache: true,
            max_normal_form_clauses: DEFAULT_MAX_NORMAL_FORM_CLAUSES,
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = FilterConfig::from_toml_str("").unwrap();

        assert_eq!(config, FilterConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = FilterConfig::from_toml_str(
            "parse_cache = false\nmax_normal_form_clauses = 8\nmax_filter_depth = 32\n",
        )
        .unwrap();

        assert!(!config.parse_cache);
        assert_eq!(config.max_normal_form_clauses, 8);
        assert_eq!(config.max_filter_depth, 32);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FilterConfig::from_toml_str("cache = true").unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_clause_limit_is_invalid() {
        let err = FilterConfig::from_toml_str("max_normal_form_clauses = 0").unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_depth_limit_is_invalid() {
        let err = FilterConfig::from_toml_str("max_filter_depth = 0").unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
