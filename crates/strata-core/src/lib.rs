//! # Strata Core
//!
//! Core types shared by every Strata crate.
//!
//! - [`InvocationId`] - UUID v7 identifier of one pipeline invocation
//! - [`StrataError`] - Error taxonomy of the pipeline (faults, configuration, arguments)
//! - [`ErrorEnvelope`] - Serializable form of an error for callers and logs

#![doc(html_root_url = "https://docs.rs/strata-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod id;

pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, StrataError, StrataResult};
pub use id::InvocationId;
