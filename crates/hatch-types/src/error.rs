//! Error types for hatch.

use std::io;

/// Errors produced by the hatch crates.
#[derive(Debug, thiserror::Error)]
pub enum HatchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("download error: {0}")]
    Download(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HatchError>;
