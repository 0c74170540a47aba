//! Runtime configuration loaded from TOML.
//!
//! Every key is optional. An empty document yields [`HatchConfig::default`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{HatchError, Result};

/// Top-level configuration (`hatch.toml`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HatchConfig {
    /// Prompt printed before each interactive line.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Whether input lines are split into positional and dash arguments.
    #[serde(default = "yes")]
    pub dash_args: bool,
    /// Prefix character that marks a dash argument.
    #[serde(default = "default_dash_prefix")]
    pub dash_prefix: char,
    /// Exact trigger matching (`false` falls back to a case-insensitive scan).
    #[serde(default = "yes")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Settings for the download helper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownloadConfig {
    /// Directory for downloads saved without an explicit destination.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Redirect hops followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u8,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn yes() -> bool {
    true
}
fn default_prompt() -> String {
    "> ".to_string()
}
fn default_dash_prefix() -> char {
    '-'
}
fn default_directory() -> PathBuf {
    PathBuf::from(".")
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_read_timeout() -> u64 {
    30
}
fn default_max_redirects() -> u8 {
    5
}
fn default_user_agent() -> String {
    concat!("hatch/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for HatchConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            dash_args: yes(),
            dash_prefix: default_dash_prefix(),
            case_sensitive: yes(),
            download: DownloadConfig::default(),
        }
    }
}

impl HatchConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            HatchError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&source)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.dash_prefix.is_whitespace() || self.dash_prefix == '"' || self.dash_prefix == '\\'
        {
            return Err(HatchError::Config(format!(
                "dash_prefix cannot be {:?}",
                self.dash_prefix
            )));
        }
        Ok(())
    }
}
