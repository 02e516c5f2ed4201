use crate::replay::DEFAULT_TIMESTAMP_FLAG;
use crate::retention::DEFAULT_MAX_AGE_DAYS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoamConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub activity_log: ActivityLogConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./loam-data")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

fn default_max_age_days() -> u64 {
    DEFAULT_MAX_AGE_DAYS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogConfig {
    #[serde(default = "default_activity_log_path")]
    pub path: PathBuf,
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            path: default_activity_log_path(),
        }
    }
}

fn default_activity_log_path() -> PathBuf {
    PathBuf::from("./var/log/cowrie/cowrie.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_deduplicate")]
    pub deduplicate: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            deduplicate: default_deduplicate(),
        }
    }
}

fn default_deduplicate() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_home")]
    pub home: String,
    #[serde(default = "default_timestamp_flag")]
    pub timestamp_flag: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            timestamp_flag: default_timestamp_flag(),
        }
    }
}

fn default_home() -> String {
    "/root".to_string()
}

fn default_timestamp_flag() -> String {
    DEFAULT_TIMESTAMP_FLAG.to_string()
}
