//! Configuration loading for reviewner.
//! Reads reviewner.toml from the current directory or the path in REVIEWNER_CONFIG.
//! Every field has a default, so a missing file runs with the stock layout:
//! `resources/` for data and `model_cli/model-best` for the model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "REVIEWNER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "reviewner.toml";

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_test_set")]
    pub test_set: PathBuf,
    #[serde(default = "default_reviews")]
    pub reviews: PathBuf,
}

fn default_test_set() -> PathBuf { Path::new("resources").join("test_set.data") }
fn default_reviews()  -> PathBuf { Path::new("resources").join("reviews.json") }

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            test_set: default_test_set(),
            reviews: default_reviews(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Hugging Face model id used when `path` does not exist.
    #[serde(default)]
    pub hub_fallback: Option<String>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "bool_true")]
    pub use_gpu: bool,
}

fn default_model_path() -> PathBuf { Path::new("model_cli").join("model-best") }
fn default_max_length() -> usize   { 512 }
fn bool_true()          -> bool    { true }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            hub_fallback: None,
            max_length: default_max_length(),
            use_gpu: bool_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_title")]
    pub title: String,
    /// Label -> CSS colour overrides for the entity highlights.
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

fn default_host()  -> String { "0.0.0.0".to_string() }
fn default_port()  -> u16    { 5000 }
fn default_title() -> String { "reviewner".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            title: default_title(),
            colors: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from reviewner.toml.
    /// Checks REVIEWNER_CONFIG first (after applying any `.env`), then the current directory.
    /// A path named in REVIEWNER_CONFIG must exist; a missing reviewner.toml means defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
    }

    fn resolve(explicit: Option<&Path>, implicit: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if !implicit.exists() {
            info!("No config at {}, using defaults", implicit.display());
            return Ok(Self::default());
        }
        Self::load_from(implicit)
    }

    /// Load configuration from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.model.max_length < 3 {
            return Err(ConfigError::Invalid(format!(
                "model.max_length must be at least 3, got {}",
                self.model.max_length
            )));
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host is empty".to_string()));
        }
        Ok(())
    }
}
