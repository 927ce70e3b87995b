use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{FRESHNESS_WINDOW_HOURS, MAX_FRESHNESS_HOURS};

/// Backend address used when no config file says otherwise.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub session: SessionConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Base URL of the segment analyzer backend
  pub url: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_SERVER_URL.to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Keep a local cache of efforts (disable to always hit the network)
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Database location (defaults to $XDG_DATA_HOME/segview/cache.db)
  pub path: Option<PathBuf>,
  /// Hours a cached effort list is served before it must be refetched,
  /// held within 0..=8760
  #[serde(default = "default_freshness_hours")]
  pub freshness_hours: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      freshness_hours: default_freshness_hours(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
  /// Reloads allowed after the backend reports an expired session
  #[serde(default = "default_max_reloads")]
  pub max_reloads: u32,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      max_reloads: default_max_reloads(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
  /// Filter directive, e.g. "info" or "segview=debug"; SEGVIEW_LOG wins
  pub level: Option<String>,
  /// Log directory (defaults to $XDG_DATA_HOME/segview/logs)
  pub directory: Option<PathBuf>,
}

fn default_true() -> bool {
  true
}

fn default_freshness_hours() -> i64 {
  FRESHNESS_WINDOW_HOURS
}

fn default_max_reloads() -> u32 {
  1
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./segview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/segview/config.yaml
  ///
  /// Falls back to defaults when no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("segview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("segview").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let mut config: Self = serde_yaml::from_str(contents)?;
    config.cache.freshness_hours = config.cache.freshness_hours.clamp(0, MAX_FRESHNESS_HOURS);
    Ok(config)
  }

  /// Get the backend session token from the environment.
  ///
  /// Checks SEGVIEW_SESSION; requests go out without a session cookie when unset.
  pub fn get_session_token() -> Option<String> {
    std::env::var("SEGVIEW_SESSION")
      .ok()
      .filter(|s| !s.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.server.url, DEFAULT_SERVER_URL);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.freshness_hours, 24);
    assert_eq!(config.session.max_reloads, 1);
  }

  #[test]
  fn test_parse_partial_config() {
    let config = Config::parse(
      r#"
server:
  url: https://segments.example.com
cache:
  enabled: false
"#,
    )
    .unwrap();

    assert_eq!(config.server.url, "https://segments.example.com");
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.path, None);
    assert_eq!(config.cache.freshness_hours, 24);
    assert_eq!(config.session.max_reloads, 1);
    assert_eq!(config.logging.level, None);
  }

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
server:
  url: http://127.0.0.1:9000
cache:
  path: /tmp/segview.db
  freshness_hours: 6
session:
  max_reloads: 3
logging:
  level: segview=debug
  directory: /tmp/segview-logs
"#,
    )
    .unwrap();

    assert!(config.cache.enabled);
    assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/segview.db")));
    assert_eq!(config.cache.freshness_hours, 6);
    assert_eq!(config.session.max_reloads, 3);
    assert_eq!(config.logging.level.as_deref(), Some("segview=debug"));
  }

  #[test]
  fn test_freshness_hours_out_of_range_are_clamped() {
    let config = Config::parse("cache:\n  freshness_hours: 9223372036854775807\n").unwrap();
    assert_eq!(config.cache.freshness_hours, MAX_FRESHNESS_HOURS);

    let config = Config::parse("cache:\n  freshness_hours: -3\n").unwrap();
    assert_eq!(config.cache.freshness_hours, 0);
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/segview.yaml"))).is_err());
  }
}
