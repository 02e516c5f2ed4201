use super::schema::LoamConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `explicit` when given, otherwise from the default locations.
    pub async fn load(explicit: Option<&Path>) -> Result<LoamConfig, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path).await,
            None => Self::load_default().await,
        }
    }

    /// Load from default locations:
    /// 1. ./loam.yaml
    /// 2. ~/.loam/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<LoamConfig, ConfigError> {
        let local_config = PathBuf::from("./loam.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".loam").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(LoamConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<LoamConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        // An empty file is a valid "all defaults" config.
        if content.trim().is_empty() {
            return Ok(LoamConfig::default());
        }
        let config: LoamConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
