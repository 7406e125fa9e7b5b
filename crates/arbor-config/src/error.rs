//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// The file that failed to load.
        path: String,
        /// The underlying IO failure.
        source: std::io::Error,
    },

    /// A config file was not valid TOML.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// The file that failed to parse.
        path: String,
        /// The underlying TOML failure.
        source: toml::de::Error,
    },

    /// A configured value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
