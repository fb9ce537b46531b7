//! Migration configuration.
//!
//! Handles loading, validating, and merging `ghost2hugo.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of keys; command-line
//! flags override both (applied by the CLI after loading).
//!
//! ## Config File Location
//!
//! `ghost2hugo.toml` in the working directory is picked up automatically.
//! `--config <path>` points somewhere else. The file is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_url = ""                    # Replaces __GHOST_URL__ in post HTML
//! # default_status = "draft"       # Force draft/published for every item
//!
//! [output]
//! posts = "content/posts"
//! pages = "content/pages"
//! invalid = "content/invalid"      # Quarantine for documents that fail validation
//!
//! [content]
//! url_placeholder = "__GHOST_URL__"
//! default_author = "Unknown"       # Used when a post has no resolvable author
//! words_per_minute = 200           # Reading-time estimate
//! description_length = 160         # Derived descriptions are cut with "..."
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! site_url = "https://blog.example.com"
//!
//! [output]
//! posts = "site/content/blog"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::metadata::BuildOptions;
use crate::markup::DEFAULT_URL_PLACEHOLDER;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "ghost2hugo.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Status forced onto every exported item, overriding Ghost's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DefaultStatus {
    Published,
    Draft,
}

impl DefaultStatus {
    pub fn is_draft(self) -> bool {
        self == DefaultStatus::Draft
    }
}

/// Migration configuration loaded from `ghost2hugo.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    /// Base URL of the old Ghost site, substituted for the URL placeholder.
    pub site_url: String,
    /// When set, overrides every item's `draft` flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_status: Option<DefaultStatus>,
    /// Where documents are written.
    pub output: OutputConfig,
    /// Conversion and front matter settings.
    pub content: ContentConfig,
}

impl MigrateConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let site_url = self.site_url.trim();
        if !site_url.is_empty()
            && !(site_url.starts_with("http://") || site_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "site_url must start with http:// or https://".into(),
            ));
        }
        for (key, dir) in [
            ("output.posts", &self.output.posts),
            ("output.pages", &self.output.pages),
            ("output.invalid", &self.output.invalid),
        ] {
            if dir.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.content.url_placeholder.is_empty() {
            return Err(ConfigError::Validation(
                "content.url_placeholder must not be empty".into(),
            ));
        }
        if self.content.words_per_minute == 0 {
            return Err(ConfigError::Validation(
                "content.words_per_minute must be positive".into(),
            ));
        }
        if self.content.description_length < 4 {
            return Err(ConfigError::Validation(
                "content.description_length must be at least 4".into(),
            ));
        }
        Ok(())
    }

    /// Front matter options derived from this config.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            draft_override: self.default_status.map(DefaultStatus::is_draft),
            default_author: self.content.default_author.clone(),
            words_per_minute: self.content.words_per_minute,
            description_length: self.content.description_length,
        }
    }
}

/// Output directories, created if absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub posts: String,
    pub pages: String,
    pub invalid: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            posts: "content/posts".to_string(),
            pages: "content/pages".to_string(),
            invalid: "content/invalid".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Token Ghost writes in place of its own base URL.
    pub url_placeholder: String,
    /// Author name used when none can be resolved.
    pub default_author: String,
    pub words_per_minute: usize,
    /// Maximum `description` length in characters.
    pub description_length: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            url_placeholder: DEFAULT_URL_PLACEHOLDER.to_string(),
            default_author: "Unknown".to_string(),
            words_per_minute: 200,
            description_length: 160,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MigrateConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<MigrateConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MigrateConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, falling back to stock defaults when
/// it does not exist.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<MigrateConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `ghost2hugo.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ghost2hugo Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (--site-url, --output-posts, ...) override this file.
# Unknown keys will cause an error.

# Base URL of the Ghost site. Replaces the URL placeholder in post HTML.
# Leave empty to keep site-relative links.
site_url = ""

# Force every exported item to draft or published, ignoring Ghost's status.
# default_status = "draft"

# ---------------------------------------------------------------------------
# Output directories (created if absent)
# ---------------------------------------------------------------------------
[output]
posts = "content/posts"
pages = "content/pages"

# Documents that fail front matter validation are moved here.
invalid = "content/invalid"

# ---------------------------------------------------------------------------
# Content conversion
# ---------------------------------------------------------------------------
[content]
# Token Ghost writes in place of its own base URL.
url_placeholder = "__GHOST_URL__"

# Author name used when a post's author cannot be resolved.
default_author = "Unknown"

# Reading speed for the reading_time estimate.
words_per_minute = 200

# Derived descriptions longer than this are cut and end in "...".
description_length = 160
"##
}
