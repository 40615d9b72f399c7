//! Run configuration.
//!
//! Handles loading, validating, and layering `imgpress.toml`. Configuration
//! is resolved in three layers, each merged on top of the previous one:
//!
//! ```text
//! stock defaults  →  imgpress.toml (optional)  →  fast overlay (--fast)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [image]
//! embed_size = 1500          # Inline re-encoded images at or below this many bytes
//! srcset_min_width = 640     # Stop generating srcset steps at or below this width
//!
//! [image.jpeg]
//! quality = 75               # 1-100
//!
//! [image.webp.lossless]
//! effort = 4                 # 0 (fastest) - 6 (smallest)
//! quality = 77
//!
//! [image.webp.lossy]
//! effort = 4
//! quality = 77
//! ```
//!
//! ## Fast Mode
//!
//! `--fast` is nothing more than one more overlay (see [`fast_overlay`]):
//! no inlining, an unreachable srcset minimum width and minimal encoder
//! effort. The pipeline itself never checks for a fast mode.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config filename looked up in the site root.
pub const CONFIG_FILENAME: &str = "imgpress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub image: ImageConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let image = &self.image;
        if !(1..=100).contains(&image.jpeg.quality) {
            return Err(ConfigError::Validation(
                "image.jpeg.quality must be 1-100".into(),
            ));
        }
        for (name, opts) in [
            ("lossless", &image.webp.lossless),
            ("lossy", &image.webp.lossy),
        ] {
            if opts.quality > 100 {
                return Err(ConfigError::Validation(format!(
                    "image.webp.{name}.quality must be 0-100"
                )));
            }
            if opts.effort > 6 {
                return Err(ConfigError::Validation(format!(
                    "image.webp.{name}.effort must be 0-6"
                )));
            }
        }
        Ok(())
    }
}

/// Image pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Re-encoded images at or below this size (bytes) become data URIs.
    pub embed_size: u64,
    /// Srcset steps are generated while the step width is above this value.
    pub srcset_min_width: u32,
    pub jpeg: JpegConfig,
    pub webp: WebpConfig,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            embed_size: 1500,
            srcset_min_width: 640,
            jpeg: JpegConfig::default(),
            webp: WebpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JpegConfig {
    pub quality: u32,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self { quality: 75 }
    }
}

/// WebP encoder settings, one set per mode.
///
/// Lossless settings are used for PNG sources, lossy settings for everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpConfig {
    pub lossless: WebpOptions,
    pub lossy: WebpOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpOptions {
    /// Encoder effort (libwebp `method`), 0-6.
    pub effort: u32,
    pub quality: u32,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self {
            effort: 4,
            quality: 77,
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
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// The overlay applied by `--fast`.
pub fn fast_overlay() -> toml::Value {
    toml::from_str(
        r#"
[image]
embed_size = 0
srcset_min_width = 16000

[image.webp.lossless]
effort = 0

[image.webp.lossy]
effort = 0
"#,
    )
    .expect("fast overlay must parse")
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
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the run configuration.
///
/// Merges the optional user file on top of stock defaults, then the fast
/// overlay when `fast` is set. Rejects unknown keys and validates the result.
pub fn load_config(path: Option<&Path>, fast: bool) -> Result<Config, ConfigError> {
    let mut overlays = Vec::new();
    if let Some(path) = path {
        overlays.extend(load_raw_config(path)?);
    }
    if fast {
        overlays.push(fast_overlay());
    }
    resolve_config(stock_defaults_value(), overlays)
}

/// Returns a fully-commented stock `imgpress.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgpress configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Image pipeline
# ---------------------------------------------------------------------------
[image]
# Re-encoded images whose size is at or below this many bytes are inlined
# as data URIs (WebP and SVG only). 0 disables inlining.
embed_size = 1500

# Srcset variants are generated in 300px steps below the image width while
# the step width stays above this value. Set it very high to disable srcset.
srcset_min_width = 640

# ---------------------------------------------------------------------------
# Encoders
# ---------------------------------------------------------------------------
[image.jpeg]
# Progressive JPEG quality for above-the-fold images (1-100).
quality = 75

# WebP settings for PNG sources.
[image.webp.lossless]
effort = 4    # 0 (fastest) - 6 (smallest)
quality = 77

# WebP settings for every other source.
[image.webp.lossy]
effort = 4
quality = 77
"##
}
