use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::chunker::ChunkingConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Overrides the data directory; primarily for tests.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    /// Model used to embed chunks and queries.
    pub embedding_model: String,
    /// Model used for per-chunk summaries, outline synthesis, and study
    /// summaries.
    pub chat_model: String,
    /// Model used for quiz generation; may emit a reasoning preamble.
    pub quiz_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Base collection name; each ingestion writes to its own generation
    /// (`<collection>_v<document-id>`).
    pub collection: String,
    /// Number of chunks retrieved per study/test query.
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to count as relevant.
    pub min_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    pub on_embedding_error: EmbeddingErrorPolicy,
}

/// What to do when embedding a single chunk fails during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingErrorPolicy {
    /// Fail the whole ingestion.
    Abort,
    /// Log a warning and drop the chunk.
    Skip,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid top_k: {0} (must be at least 1)")]
    InvalidTopK(usize),
    #[error("Invalid min_score: {0} (must be between 0.0 and 1.0)")]
    InvalidMinScore(f32),
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),
    #[error("Invalid chunking: {0}")]
    InvalidChunking(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            store: StoreConfig::default(),
            chunking: ChunkingConfig::default(),
            ingest: IngestConfig::default(),
            base_dir: None,
        }
    }
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "mxbai-embed-large".to_string(),
            chat_model: "llama3.2".to_string(),
            quiz_model: "deepseek-r1:8b".to_string(),
        }
    }
}

impl Default for StoreConfig {
    #[inline]
    fn default() -> Self {
        Self {
            collection: "my_collection".to_string(),
            top_k: 5,
            min_score: 0.7,
        }
    }
}

impl Default for IngestConfig {
    #[inline]
    fn default() -> Self {
        Self {
            on_embedding_error: EmbeddingErrorPolicy::Abort,
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".pdf-tutor"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory holding the document registry and the vector store.
    #[inline]
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }

    #[inline]
    pub fn registry_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("tutor.db"))
    }

    #[inline]
    pub fn vectors_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("vectors"))
    }

    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = Self::config_dir().context("Failed to determine config directory")?;

        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.store.validate()?;
        self.chunking
            .validate()
            .map_err(|e| ConfigError::InvalidChunking(e.to_string()))?;
        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("http://{}:{}", self.ollama.host, self.ollama.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        for model in [&self.embedding_model, &self.chat_model, &self.quiz_model] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        let url_str = format!("http://{}:{}", self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        Ok(())
    }
}

impl StoreConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty()
            || !self
                .collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ConfigError::InvalidMinScore(self.min_score));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.host, "localhost");
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.ollama.embedding_model, "mxbai-embed-large");
        assert_eq!(config.ollama.chat_model, "llama3.2");
        assert_eq!(config.ollama.quiz_model, "deepseek-r1:8b");
        assert_eq!(config.store.collection, "my_collection");
        assert_eq!(config.store.top_k, 5);
        assert_eq!(config.store.min_score, 0.7);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(
            config.ingest.on_embedding_error,
            EmbeddingErrorPolicy::Abort
        );
    }

    #[test]
    fn config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.ollama.port = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.ollama.embedding_model = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.store.top_k = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.store.min_score = 1.5;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.store.collection = "no spaces allowed".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config;
        invalid_config.chunking.chunk_overlap = 1000;
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn ollama_url_generation() {
        let config = Config::default();
        let url = config
            .ollama_url()
            .expect("should generate ollama_url successfully");
        assert_eq!(url.as_str(), "http://localhost:11434/");
    }

    #[test]
    fn toml_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
        let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
        assert_eq!(config, parsed_config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [ollama]
            host = "embedhost"
            port = 11434
            embedding_model = "mxbai-embed-large"
            chat_model = "llama3.2"
            quiz_model = "deepseek-r1:8b"
            "#,
        )
        .expect("should parse toml correctly");

        assert_eq!(parsed.ollama.host, "embedhost");
        assert_eq!(parsed.store, StoreConfig::default());
        assert_eq!(parsed.chunking, ChunkingConfig::default());
    }

    #[test]
    fn base_dir_overrides_data_paths() {
        let config = Config {
            base_dir: Some(PathBuf::from("/tmp/tutor-test")),
            ..Config::default()
        };
        assert_eq!(
            config.registry_path().expect("registry path"),
            PathBuf::from("/tmp/tutor-test/tutor.db")
        );
        assert_eq!(
            config.vectors_path().expect("vectors path"),
            PathBuf::from("/tmp/tutor-test/vectors")
        );
    }
}
