//! Foundation types for hatch.
//!
//! Shared by every hatch crate: the error enum with its `Result` alias and
//! the TOML-backed runtime configuration.

pub mod config;
pub mod error;
