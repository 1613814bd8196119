//! Configuration Management
//!
//! Handles persistent configuration storage for awscmd.

use crate::remote::{ClientConfig, DEFAULT_REGION, DEFAULT_TIMEOUT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How output values are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON, one document per value
    #[default]
    Json,
    /// Compact JSON, one value per line
    Jsonl,
    Yaml,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Endpoint used for every service
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Default server-side page size hint
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub output: Option<OutputFormat>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("awscmd").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective region (config > AWS_REGION > AWS_DEFAULT_REGION > us-east-1)
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(|| env_non_empty("AWS_REGION"))
            .or_else(|| env_non_empty("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Get effective endpoint (config > AWS_ENDPOINT_URL)
    pub fn effective_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| env_non_empty("AWS_ENDPOINT_URL"))
    }

    pub fn effective_timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Client configuration, with command-line overrides taking precedence
    pub fn client_config(&self, endpoint: Option<String>, region: Option<String>) -> ClientConfig {
        let region = region.unwrap_or_else(|| self.effective_region());
        ClientConfig::new(endpoint.or_else(|| self.effective_endpoint()), &region)
            .with_timeout(self.effective_timeout())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("awscmd-test-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(&temp_config_path());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_config_path();
        let config = Config {
            endpoint: Some("http://localhost:4566".into()),
            region: Some("eu-central-1".into()),
            page_size: Some(50),
            output: Some(OutputFormat::Yaml),
            timeout_secs: Some(5),
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"output\": \"yaml\""));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = Config {
            endpoint: Some("http://config:1".into()),
            region: Some("ap-south-1".into()),
            timeout_secs: Some(7),
            ..Default::default()
        };

        let client = config.client_config(Some("http://cli:2".into()), Some("us-west-2".into()));
        assert_eq!(client.endpoint.as_deref(), Some("http://cli:2"));
        assert_eq!(client.region, "us-west-2");
        assert_eq!(client.timeout, Duration::from_secs(7));

        let client = config.client_config(None, None);
        assert_eq!(client.endpoint.as_deref(), Some("http://config:1"));
        assert_eq!(client.region, "ap-south-1");
    }
}
