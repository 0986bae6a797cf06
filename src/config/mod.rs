mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = ["./config.toml", "./alembic.toml", "/etc/alembic/config.toml"];

    for path_str in default_paths {
        let path = Path::new(path_str);
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.retention.window_secs == 0 {
        anyhow::bail!("Retention window cannot be 0");
    }

    if config.storage.upload_dir == config.storage.converted_dir {
        anyhow::bail!("Upload and converted directories must be distinct");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retention.window_secs, 3600);
        assert_eq!(config.limits.max_upload_bytes, 100 * 1024 * 1024);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [retention]
            window_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.retention.window_secs, 120);
        assert_eq!(config.retention.sweep_interval_secs, 300);
    }

    #[test]
    fn rejects_matching_storage_directories() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            upload_dir = "data/files"
            converted_dir = "data/files"
            "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }
}
