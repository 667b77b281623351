//! # Strata Config
//!
//! Typed configuration for Strata pipelines and their telemetry.
//!
//! Configuration is layered, later layers overriding earlier ones:
//!
//! 1. Defaults or a preset ([`StrataConfig::development`], [`StrataConfig::production`])
//! 2. A TOML or JSON file
//! 3. Environment variables named `PREFIX__SECTION__KEY`
//!
//! Every section uses `deny_unknown_fields`, so a misspelled key is an
//! error rather than a silently ignored setting.
//!
//! ## Example
//!
//! ```
//! use strata_config::ConfigLoader;
//! use strata_filter::PipelineOptions;
//!
//! let config = ConfigLoader::new()
//!     .with_string("[pipeline]\nmax_stages = 8\n", "toml")
//!     .unwrap()
//!     .load()
//!     .unwrap();
//!
//! let options = PipelineOptions::from(&config.pipeline);
//! assert_eq!(options.max_stages, Some(8));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use schema::*;
