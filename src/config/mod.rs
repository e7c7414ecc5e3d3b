//! Plugin configuration from `configs/limit-dependencies.toml`.
//!
//! # Example
//!
//! ```toml
//! prefix = "limit-dependencies"       # Virtual path namespace (`/@<prefix>/<id>`)
//! filter_name = "limit_dependencies"  # Template filter name
//! verbose = false                     # Log cache and decode details
//! ```
//!
//! Every key is optional. A project without the file gets the defaults.

mod error;

pub use error::ConfigError;

use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file location, relative to the project root.
pub const CONFIG_FILE: &str = "configs/limit-dependencies.toml";

/// Default virtual path namespace.
pub const DEFAULT_PREFIX: &str = "limit-dependencies";

/// Default template filter name.
pub const DEFAULT_FILTER_NAME: &str = "limit_dependencies";

// ============================================================================
// PluginConfig
// ============================================================================

/// Settings for the limit-dependencies plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Virtual path namespace the frozen results live under.
    pub prefix: String,

    /// Name the template filter is registered as.
    pub filter_name: String,

    /// Enable debug logging.
    pub verbose: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            filter_name: DEFAULT_FILTER_NAME.to_string(),
            verbose: false,
        }
    }
}

impl PluginConfig {
    /// Load `configs/limit-dependencies.toml` from a project root.
    ///
    /// Falls back to the defaults when the file does not exist.
    pub fn discover(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    /// Load configuration from a file path, warning about unknown fields.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            print_unknown_fields_warning(&ignored, path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Check that the prefix is a single URL-safe path segment and the
    /// filter name is an identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::Validation("`prefix` must not be empty".into()));
        }
        if let Some(bad) = self
            .prefix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ConfigError::Validation(format!(
                "`prefix` contains invalid character {bad:?}"
            )));
        }

        let mut chars = self.filter_name.chars();
        let valid_name = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(ConfigError::Validation(format!(
                "`filter_name` must be an identifier, got {:?}",
                self.filter_name
            )));
        }

        Ok(())
    }
}

/// Print warning about unknown fields.
fn print_unknown_fields_warning(fields: &[String], path: &Path) {
    let display_path = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
}

/// Absolute config path for a project root.
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE)
}

// ============================================================================
// tests
// ============================================================================
