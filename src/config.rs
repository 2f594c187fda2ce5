use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub upstream: UpstreamConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
    }
  }
}

fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 3000))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
  /// Base URL of the profile scraper; the username is appended as a path segment
  #[serde(default = "default_profile_url")]
  pub profile_url: String,
  /// Base URL of the analysis service
  #[serde(default = "default_analysis_url")]
  pub analysis_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl UpstreamConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      profile_url: default_profile_url(),
      analysis_url: default_analysis_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_profile_url() -> String {
  "http://localhost:3003/leetcode".to_string()
}

fn default_analysis_url() -> String {
  "http://127.0.0.1:3002/analyze".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// Persistent SQLite file
  #[default]
  Sqlite,
  /// In-process map, lost on restart
  Memory,
  /// Caching disabled
  None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: CacheBackend,
  /// SQLite file (defaults to $XDG_DATA_HOME/leetproxy/cache.db)
  pub path: Option<PathBuf>,
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      backend: CacheBackend::default(),
      path: None,
      ttl_secs: default_ttl_secs(),
    }
  }
}

/// One year.
const MAX_TTL_SECS: u64 = 365 * 24 * 3600;
const MAX_TIMEOUT_SECS: u64 = 3600;

fn default_ttl_secs() -> u64 {
  3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_level")]
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_level(),
      file: None,
    }
  }
}

fn default_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./leetproxy.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/leetproxy/config.yaml
  ///
  /// Falls back to built-in defaults when nothing is found.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    config.with_port_override(std::env::var("PORT").ok().as_deref())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("leetproxy.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("leetproxy").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid and means "all defaults".
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Reject durations the stores and HTTP client can't represent.
  fn validate(&self) -> Result<()> {
    if !(1..=MAX_TTL_SECS).contains(&self.cache.ttl_secs) {
      return Err(eyre!(
        "cache.ttl_secs must be between 1 and {}, got {}",
        MAX_TTL_SECS,
        self.cache.ttl_secs
      ));
    }
    if !(1..=MAX_TIMEOUT_SECS).contains(&self.upstream.timeout_secs) {
      return Err(eyre!(
        "upstream.timeout_secs must be between 1 and {}, got {}",
        MAX_TIMEOUT_SECS,
        self.upstream.timeout_secs
      ));
    }
    Ok(())
  }

  /// Apply the `PORT` environment variable, keeping the configured host.
  fn with_port_override(mut self, port: Option<&str>) -> Result<Self> {
    if let Some(port) = port {
      let port: u16 = port
        .parse()
        .map_err(|e| eyre!("Invalid PORT value {:?}: {}", port, e))?;
      self.server.bind.set_port(port);
    }
    Ok(self)
  }
}
