//! Engine configuration.
//!
//! Loaded from TOML; every section and key is optional and falls back to
//! the defaults below.
//!
//! ```toml
//! debug = false
//!
//! [pagination]
//! default_page_size = 25
//! max_page_size = 100
//!
//! [query]
//! timeout_ms = 5000
//! predicate_cache_capacity = 256
//! ```

use serde::Deserialize;
use std::{fs, path::Path, time::Duration};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// EngineConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub pagination: PaginationConfig,
    pub query: QueryConfig,

    /// Log compiled predicates and populate plans at `debug` level.
    pub debug: bool,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let PaginationConfig {
            default_page_size,
            max_page_size,
        } = self.pagination;

        if max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_page_size must be at least 1".to_string(),
            ));
        }
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_page_size must be in 1..={max_page_size}"
            )));
        }
        if self.query.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "query.timeout_ms must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}

///
/// PaginationConfig
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl PaginationConfig {
    pub const DEFAULT_PAGE_SIZE: u32 = 25;
    pub const MAX_PAGE_SIZE: u32 = 100;
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: Self::DEFAULT_PAGE_SIZE,
            max_page_size: Self::MAX_PAGE_SIZE,
        }
    }
}

///
/// QueryConfig
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Deadline applied to every call that does not carry its own.
    pub timeout_ms: Option<u64>,

    /// Compiled predicates kept before the cache is cleared. Zero disables it.
    pub predicate_cache_capacity: usize,
}

impl QueryConfig {
    pub const PREDICATE_CACHE_CAPACITY: usize = 256;

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            predicate_cache_capacity: Self::PREDICATE_CACHE_CAPACITY,
        }
    }
}

///
/// TESTS
///
