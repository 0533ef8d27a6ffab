use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::sync::DEFAULT_PAGE_SIZE;

fn default_status_filter() -> String {
    "ACTIVE".to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// bunq provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BunqConfig {
    /// Override API base URL. Defaults to the production API.
    pub api_base: Option<String>,

    /// The bunq user id to sync.
    pub user_id: Option<i64>,

    /// Session token, inline. Prefer `token_path` to keep it out of config.
    pub token: Option<String>,

    /// Path to a file holding the session token.
    pub token_path: Option<PathBuf>,
}

impl BunqConfig {
    /// Resolve the session token: inline value wins, else the token file.
    pub fn resolve_token(&self) -> Result<SecretString> {
        if let Some(token) = &self.token {
            return Ok(SecretString::new(token.clone().into()));
        }
        if let Some(path) = &self.token_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read token file: {}", path.display()))?;
            return Ok(SecretString::new(content.trim().to_string().into()));
        }
        anyhow::bail!("No bunq session token configured (set bunq.token or bunq.token_path)");
    }
}

/// Sync pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Payments requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Account status the sync is restricted to (exact match).
    #[serde(default = "default_status_filter")]
    pub status_filter: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            status_filter: default_status_filter(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// bunq provider settings.
    #[serde(default)]
    pub bunq: BunqConfig,

    /// Sync pipeline settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    /// bunq provider settings.
    pub bunq: BunqConfig,

    /// Sync pipeline settings.
    pub sync: SyncConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./budgetbuddy.toml` if it exists in current directory
/// 2. `~/.local/share/budgetbuddy/budgetbuddy.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("budgetbuddy.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("budgetbuddy").join("budgetbuddy.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);

        Ok(Self {
            data_dir,
            bunq: config.bunq,
            sync: config.sync,
        })
    }

    /// Load config, creating a default if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Ok(Self {
                data_dir: config_dir.to_path_buf(),
                bunq: BunqConfig::default(),
                sync: SyncConfig::default(),
            })
        }
    }
}
