//! Failures while loading or checking a [`StrataConfig`](crate::StrataConfig).

use std::path::PathBuf;
use strata_core::StrataError;
use thiserror::Error;

/// Why a configuration could not be produced.
///
/// Converts into [`StrataError`] with the `Configuration` category, so
/// callers can mix config loading with pipeline building under one `?`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file is absent.
    #[error("config file {path} does not exist")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The file exists but reading it failed.
    #[error("cannot read config file {path}")]
    ReadError {
        /// Path that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or TOML that does not fit the schema.
    #[error("bad TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Malformed JSON, or JSON that does not fit the schema.
    #[error("bad JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Neither TOML nor JSON.
    #[error("unsupported config format `{format}`")]
    UnsupportedFormat {
        /// Extension or format name as given.
        format: String,
    },

    /// A value parsed but broke a validation rule.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted path, e.g. `pipeline.max_stages`.
        field: String,
        /// Rule that was broken.
        reason: String,
    },

    /// An override variable could not be applied.
    #[error("environment variable {var}: {reason}")]
    EnvParseError {
        /// Full variable name including the prefix.
        var: String,
        /// What was expected.
        reason: String,
    },
}

impl ConfigError {
    /// [`ConfigError::FileNotFound`] for `path`.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// [`ConfigError::ReadError`] wrapping `source`.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// [`ConfigError::UnsupportedFormat`].
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// [`ConfigError::InvalidValue`] for a dotted field path.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// [`ConfigError::EnvParseError`] for variable `var`.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for StrataError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}
