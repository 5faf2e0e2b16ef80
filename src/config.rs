//! Engine configuration
//!
//! Loaded from a TOML file with sensible defaults; connection settings can
//! be overridden from the environment so deployments never need to write
//! credentials to disk.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::retrieval::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub usage: UsageConfig,
}

/// Retry behavior for empty retrievals; the delay absorbs vector DB
/// write-propagation lag and is deployment-tunable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub retry_delay_secs: u64,
    pub max_retries: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: 2,
            max_retries: 1,
        }
    }
}

impl RetrievalConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.retry_delay_secs),
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Ollama base URL for completions and embeddings
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    /// Qdrant endpoint
    pub vector_db_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            vector_db_url: "http://localhost:6334".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Postgres connection string for the usage store; empty disables
    /// usage aggregation
    pub database_url: String,
    pub db_schema: String,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            db_schema: "unstract".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, creating defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            let config = EngineConfig::default();
            config.save()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, toml_string).context("Failed to write config file")?;
        Ok(())
    }

    /// Configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".promptloom").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ENGINE_DATABASE_URL") {
            self.usage.database_url = url;
        }
        if let Ok(schema) = std::env::var("ENGINE_DB_SCHEMA") {
            self.usage.db_schema = schema;
        }
        if let Ok(url) = std::env::var("ENGINE_OLLAMA_URL") {
            self.provider.base_url = url;
        }
        if let Ok(url) = std::env::var("ENGINE_VECTOR_DB_URL") {
            self.provider.vector_db_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.retrieval.retry_delay_secs, 2);
        assert_eq!(config.retrieval.max_retries, 1);
        assert_eq!(config.usage.db_schema, "unstract");
        assert!(config.usage.database_url.is_empty());
    }

    #[test]
    fn test_retry_policy_conversion() {
        let config = RetrievalConfig {
            retry_delay_secs: 5,
            max_retries: 3,
        };
        let policy = config.retry_policy();
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.max_retries, 3);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = EngineConfig::default();
        config.provider.model = "qwen2.5:7b-instruct".to_string();

        let toml_string = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized.provider.model, "qwen2.5:7b-instruct");
        assert_eq!(deserialized.retrieval.retry_delay_secs, 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig =
            toml::from_str("[retrieval]\nretry_delay_secs = 4\nmax_retries = 2\n").unwrap();
        assert_eq!(config.retrieval.retry_delay_secs, 4);
        assert_eq!(config.provider.model, "llama3.1:8b");
    }
}
