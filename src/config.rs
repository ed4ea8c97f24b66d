//! Configuration module for the moodboard matcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! The matcher core itself takes no configuration beyond its dataset
//! source; `Settings` exists so hosts can wire the dataset, matcher, and
//! extractor together explicitly at startup instead of reading ambient
//! global state.
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MOODMATCH_` and use double
//! underscores to separate nested levels:
//! - `MOODMATCH_MATCHER__DEFAULT_LIMIT=10` sets `matcher.default_limit`
//! - `MOODMATCH_DATASET__EMBEDDINGS_PATH=...` sets `dataset.embeddings_path`
//! - `MOODMATCH_EXTRACTOR__MODEL=resnet50` sets `extractor.model`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dataset::DatasetSource;
use crate::matcher::EMBEDDING_DIMENSION_512;

/// Name of the configuration file looked up in the working directory.
const CONFIG_FILE: &str = "moodmatch.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Dataset file locations
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Matcher settings
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Feature extractor settings
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatasetConfig {
    /// Path to the binary embeddings file
    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: PathBuf,

    /// Path to the JSON identifier sidecar
    #[serde(default = "default_identifiers_path")]
    pub identifiers_path: PathBuf,
}

impl DatasetConfig {
    /// Returns the dataset source described by this configuration.
    #[must_use]
    pub fn source(&self) -> DatasetSource {
        DatasetSource::new(self.embeddings_path.clone(), self.identifiers_path.clone())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatcherConfig {
    /// Expected embedding dimension for the reference set
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Number of matches returned when the caller has no preference
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtractorConfig {
    /// Image embedding model ("clip-vit-b-32" or "resnet50")
    #[serde(default = "default_model")]
    pub model: String,

    /// Cache directory for downloaded model files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Show a progress bar on first-time model download
    #[serde(default = "default_false")]
    pub show_download_progress: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_embeddings_path() -> PathBuf {
    PathBuf::from("data/references.mvec")
}
fn default_identifiers_path() -> PathBuf {
    PathBuf::from("data/references.json")
}
fn default_dimension() -> usize {
    EMBEDDING_DIMENSION_512
}
fn default_limit() -> usize {
    5
}
fn default_model() -> String {
    "clip-vit-b-32".to_string()
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            dataset: DatasetConfig::default(),
            matcher: MatcherConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            embeddings_path: default_embeddings_path(),
            identifiers_path: default_identifiers_path(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            default_limit: default_limit(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(CONFIG_FILE))
            // Layer in environment variables with MOODMATCH_ prefix
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("MOODMATCH_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".") // Double underscore becomes dot
                    .into()
            }))
            // Extract into Settings struct
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }
}
