//! Configuration loading and validation.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables, so a deployment can address the index purely
//! through the environment:
//!
//! | Variable | Key |
//! |----------|-----|
//! | `STATUTE_INDEX_LOCATION` | `index.location` |
//! | `STATUTE_COLLECTION` | `index.collection` |
//! | `STATUTE_CORPUS_PATH` | `corpus.path` |
//! | `STATUTE_EMBEDDING_PROVIDER` | `embedding.provider` |
//! | `STATUTE_EMBEDDING_MODEL` | `embedding.model` |
//!
//! Addressing (location + collection) is only required by the commands that
//! touch the index; see [`IndexConfig::address`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::IndexError;

/// Name of the SQLite file inside an index location.
pub const INDEX_FILE_NAME: &str = "index.sqlite";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    /// Directory that holds the index database.
    pub location: Option<PathBuf>,
    /// Collection name inside the index.
    pub collection: Option<String>,
}

/// A fully specified index address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAddress {
    pub location: PathBuf,
    pub collection: String,
}

impl IndexAddress {
    pub fn new(location: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            collection: collection.into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.location.join(INDEX_FILE_NAME)
    }
}

impl IndexConfig {
    /// Resolve the (location, collection) pair, or fail with a configuration
    /// error before any I/O happens.
    pub fn address(&self) -> Result<IndexAddress> {
        let location = self
            .location
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                IndexError::Configuration(
                    "index.location is not set (or STATUTE_INDEX_LOCATION)".to_string(),
                )
            })?;
        let collection = self
            .collection
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                IndexError::Configuration(
                    "index.collection is not set (or STATUTE_COLLECTION)".to_string(),
                )
            })?;
        Ok(IndexAddress {
            location,
            collection,
        })
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorpusConfig {
    /// Path of the intermediate corpus JSON file.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results returned when the caller does not ask for a specific `k`.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Load the config file (if it exists), apply environment overrides, and
/// validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content)
        .map_err(|e| IndexError::Configuration(format!("failed to parse config: {}", e)).into())
}

/// Apply `STATUTE_*` overrides using the given variable lookup.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("STATUTE_INDEX_LOCATION") {
        config.index.location = Some(PathBuf::from(v));
    }
    if let Some(v) = non_empty("STATUTE_COLLECTION") {
        config.index.collection = Some(v);
    }
    if let Some(v) = non_empty("STATUTE_CORPUS_PATH") {
        config.corpus.path = Some(PathBuf::from(v));
    }
    if let Some(v) = non_empty("STATUTE_EMBEDDING_PROVIDER") {
        config.embedding.provider = v;
    }
    if let Some(v) = non_empty("STATUTE_EMBEDDING_MODEL") {
        config.embedding.model = Some(v);
    }
}

pub fn validate(config: &Config) -> Result<()> {
    let bad = |msg: String| -> anyhow::Error { IndexError::Configuration(msg).into() };

    if config.retrieval.top_k < 1 {
        return Err(bad("retrieval.top_k must be >= 1".to_string()));
    }
    if config.embedding.batch_size < 1 {
        return Err(bad("embedding.batch_size must be >= 1".to_string()));
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" | "hash" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                return Err(bad(format!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                )));
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                return Err(bad(format!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                )));
            }
        }
        other => {
            return Err(bad(format!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, local, or hash.",
                other
            )))
        }
    }

    if config.embedding.dims == Some(0) {
        return Err(bad("embedding.dims must be > 0".to_string()));
    }

    Ok(())
}
