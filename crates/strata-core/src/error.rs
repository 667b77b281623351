//! Error types for Strata.
//!
//! [`StrataError`] covers everything that can go wrong while building or
//! running a pipeline. A short-circuit is deliberately absent from this
//! taxonomy: a stage that stops the pipeline early produces a normal result.

use crate::InvocationId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`StrataError`].
pub type StrataResult<T> = Result<T, StrataError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A stage or the terminal handler failed while running.
    Fault,
    /// The pipeline was built from an invalid registration.
    Configuration,
    /// A positional argument was missing or had an unexpected type.
    Argument,
    /// The invocation observed a cancellation request.
    Cancelled,
    /// No pipeline is registered under the requested target.
    NotFound,
}

impl ErrorCategory {
    /// Returns the machine-readable code for this category.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Fault => "UNHANDLED_FAULT",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Argument => "ARGUMENT_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::NotFound => "TARGET_NOT_FOUND",
        }
    }
}

/// Standard error type for Strata.
///
/// # Example
///
/// ```
/// use strata_core::{ErrorCategory, StrataError};
///
/// let err = StrataError::fault_in("audit", "ledger unavailable");
/// assert_eq!(err.category(), ErrorCategory::Fault);
/// assert_eq!(err.stage(), Some("audit"));
/// ```
#[derive(Error, Debug)]
pub enum StrataError {
    /// A stage or the terminal handler failed. Propagates without recovery
    /// unless a fault-handling stage is registered outward of the failure.
    #[error("Unhandled fault: {message}")]
    Fault {
        /// Name of the stage that raised the fault, when known.
        stage: Option<String>,
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The pipeline registration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// A positional argument could not be read.
    #[error("Argument error at position {index}: {reason}")]
    Argument {
        /// Position of the argument.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// The invocation was cancelled.
    #[error("Invocation cancelled")]
    Cancelled,

    /// No pipeline is registered for the target.
    #[error("No pipeline registered for target '{target}'")]
    NotFound {
        /// The requested target name.
        target: String,
    },
}

impl StrataError {
    /// Creates a fault without stage attribution.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            stage: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fault attributed to a stage.
    #[must_use]
    pub fn fault_in(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            stage: Some(stage.into()),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fault wrapping an underlying error.
    pub fn fault_with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Fault {
            stage: None,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an error for a position past the end of the arguments.
    #[must_use]
    pub fn argument_missing(index: usize, len: usize) -> Self {
        Self::Argument {
            index,
            reason: format!("only {len} argument(s) supplied"),
        }
    }

    /// Creates an error for an argument of the wrong type.
    #[must_use]
    pub fn argument_type(index: usize, expected: &str) -> Self {
        Self::Argument {
            index,
            reason: format!("expected a value of type `{expected}`"),
        }
    }

    /// Creates a not found error for a registry target.
    #[must_use]
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    /// Attributes a fault to `stage` unless it already names one.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_stage(self, name: &str) -> Self {
        match self {
            Self::Fault {
                stage: None,
                message,
                source,
            } => Self::Fault {
                stage: Some(name.to_string()),
                message,
                source,
            },
            other => other,
        }
    }

    /// Returns the stage a fault is attributed to.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Fault { stage, .. } => stage.as_deref(),
            _ => None,
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Fault { .. } => ErrorCategory::Fault,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Argument { .. } => ErrorCategory::Argument,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::NotFound { .. } => ErrorCategory::NotFound,
        }
    }

    /// Returns `true` for faults raised while running the pipeline.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    /// Converts this error to a serializable envelope.
    #[must_use]
    pub fn to_envelope(&self, invocation_id: Option<InvocationId>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.category().code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            invocation_id: invocation_id.map(|id| id.to_string()),
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Fault {
                stage: Some(stage), ..
            } => Some(serde_json::json!({ "stage": stage })),
            Self::Argument { index, .. } => Some(serde_json::json!({ "index": index })),
            Self::NotFound { target } => Some(serde_json::json!({ "target": target })),
            _ => None,
        }
    }
}

/// Serializable error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The invocation ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_without_stage() {
        let err = StrataError::fault("boom");
        assert_eq!(err.category(), ErrorCategory::Fault);
        assert!(err.is_fault());
        assert!(err.stage().is_none());
        assert_eq!(err.to_string(), "Unhandled fault: boom");
    }

    #[test]
    fn test_with_stage_only_fills_missing_attribution() {
        let err = StrataError::fault("boom").with_stage("inner");
        assert_eq!(err.stage(), Some("inner"));

        let err = err.with_stage("outer");
        assert_eq!(err.stage(), Some("inner"));
    }

    #[test]
    fn test_with_stage_ignores_other_variants() {
        let err = StrataError::configuration("missing handler").with_stage("auth");
        assert!(err.stage().is_none());
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_fault_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = StrataError::fault_with_source("write failed", io);
        let source = std::error::Error::source(&err).expect("source should be kept");
        assert!(source.to_string().contains("disk gone"));
    }

    #[test]
    fn test_argument_errors() {
        let err = StrataError::argument_missing(3, 1);
        assert_eq!(err.category(), ErrorCategory::Argument);
        assert!(err.to_string().contains("position 3"));

        let err = StrataError::argument_type(0, "u32");
        assert!(err.to_string().contains("`u32`"));
    }

    #[test]
    fn test_envelope_serialization() {
        let id = InvocationId::new();
        let err = StrataError::fault_in("audit", "ledger unavailable");
        let envelope = err.to_envelope(Some(id));

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert!(json.contains("\"code\":\"UNHANDLED_FAULT\""));
        assert!(json.contains("\"category\":\"fault\""));
        assert!(json.contains("\"stage\":\"audit\""));
        assert!(json.contains(&id.to_string()));
    }

    #[test]
    fn test_envelope_without_details() {
        let envelope = StrataError::Cancelled.to_envelope(None);
        assert_eq!(envelope.error.code, "CANCELLED");
        assert!(envelope.error.details.is_none());
        assert!(envelope.invocation_id.is_none());

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("invocation_id"));
    }

    #[test]
    fn test_not_found_details() {
        let envelope = StrataError::not_found("getUser").to_envelope(None);
        assert_eq!(envelope.error.details.unwrap()["target"], "getUser");
    }
}
