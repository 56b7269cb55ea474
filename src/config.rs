use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::remote::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub github: GitHubConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
  /// API root, e.g. `https://github.example.com/api/v3` for GitHub Enterprise
  pub url: String,
  /// Users requested per page (GitHub caps this at 100)
  pub per_page: u32,
  pub user_agent: String,
}

impl Default for GitHubConfig {
  fn default() -> Self {
    Self {
      url: "https://api.github.com".to_string(),
      per_page: DEFAULT_PAGE_SIZE,
      user_agent: concat!("ghsync/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Database file (defaults to $XDG_DATA_HOME/ghsync/cache.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is not set
  pub level: String,
  /// Write logs to daily files in this directory instead of stderr
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      dir: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ghsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ghsync/config.yaml
  ///
  /// Falls back to defaults when no file is found, since the public GitHub API
  /// needs no setup.
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
    let local = PathBuf::from("ghsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ghsync").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents)?;

    if config.github.per_page == 0 {
      return Err(eyre!("github.per_page must be greater than zero"));
    }

    Ok(config)
  }

  /// Get the GitHub API token from environment variables, if any.
  ///
  /// Checks GHSYNC_TOKEN first, then GITHUB_TOKEN as fallback. Requests are
  /// sent unauthenticated when neither is set.
  pub fn api_token() -> Option<String> {
    std::env::var("GHSYNC_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .ok()
      .filter(|token| !token.is_empty())
  }
}
