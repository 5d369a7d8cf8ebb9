//! Application configuration for Newsdesk.
//!
//! User config lives at `~/.newsdesk/newsdesk.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NewsdeskError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newsdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newsdesk";

// ---------------------------------------------------------------------------
// Config structs (matching newsdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Feed pagination limits.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Category → page entries layered over the built-in table.
    /// Keys are category names, values page tags (e.g. `Religious = "religious"`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub category_pages: BTreeMap<String, String>,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "var/newsdesk.db".into()
}

/// `[feed]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Page size used when a request does not specify `limit`.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound for `limit`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}
fn default_max_page_size() -> u32 {
    100
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newsdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NewsdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newsdesk/newsdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NewsdeskError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        NewsdeskError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject settings that would make the server misbehave at runtime.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let feed = &config.feed;
    if feed.max_page_size == 0 {
        return Err(NewsdeskError::config("feed.max_page_size must be at least 1"));
    }
    if feed.default_page_size == 0 || feed.default_page_size > feed.max_page_size {
        return Err(NewsdeskError::config(format!(
            "feed.default_page_size must be between 1 and {}",
            feed.max_page_size
        )));
    }
    if config.database.path.trim().is_empty() {
        return Err(NewsdeskError::config("database.path must not be empty"));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NewsdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NewsdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NewsdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("bind_addr"));
        assert!(toml_str.contains("newsdesk.db"));
        assert!(!toml_str.contains("category_pages"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.feed.default_page_size, 10);
        assert_eq!(parsed.feed.max_page_size, 100);
    }

    #[test]
    fn config_with_category_pages() {
        let toml_str = r#"
[server]
port = 8080

[category_pages]
Religious = "religious"
Technology = "technology"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.category_pages.len(), 2);
        assert_eq!(config.category_pages["Religious"], "religious");
    }

    #[test]
    fn invalid_feed_limits_rejected() {
        let mut config = AppConfig::default();
        config.feed.default_page_size = 500;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_page_size"));

        config.feed.max_page_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("newsdesk_cfg_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[database]\npath = \"/tmp/news.db\"\n").expect("write");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.database.path, "/tmp/news.db");
        let _ = std::fs::remove_file(&path);
    }
}
