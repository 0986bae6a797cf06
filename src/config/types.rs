use alembic_backends::ToolPaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Where uploaded sources land.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Where converted outputs land.
    #[serde(default = "default_converted_dir")]
    pub converted_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}
fn default_converted_dir() -> PathBuf {
    PathBuf::from("data/converted")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            converted_dir: default_converted_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Maximum accepted upload size in bytes (default: 100 MB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Age after which jobs and their artifacts are reclaimed (default: 1h).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How often the sweeper runs (default: 5 minutes).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_window_secs() -> u64 {
    3600
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}
