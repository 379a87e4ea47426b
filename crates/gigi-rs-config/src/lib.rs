//! Configuration models and loading for the Gigi engine.
//!
//! This crate owns the engine config schema, serde defaults, and JSON5
//! loading with strict key validation.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Configuration schema models.
pub use model::*;
