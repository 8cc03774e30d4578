//! Configuration management for dadgar
//!
//! Handles the ~/.dadgar/ directory structure and config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
}

/// Model access settings. `endpoint` points at the credential-injecting
/// proxy, never at the provider directly; the client side of the app
/// holds no API key.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    pub fn endpoint_or_default(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:8787/api/generate".to_string())
    }

    pub fn model_or_default(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| "gemini-2.5-flash".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub port: u16,
    pub host: String,
    /// Upstream generative-language API base.
    pub upstream: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            host: "127.0.0.1".to_string(),
            upstream: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Debounce window before in-progress input is flushed to disk.
    pub debounce_ms: u64,
    /// How long the "saved" indicator lingers before reverting to idle.
    pub linger_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            linger_ms: 2000,
        }
    }
}

/// Returns the path to the dadgar home directory (~/.dadgar)
pub fn dadgar_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".dadgar"))
}

/// Paths to all dadgar directories
pub struct DadgarPaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub db: PathBuf,
    pub db_file: PathBuf,
}

impl DadgarPaths {
    pub fn new() -> Result<Self> {
        let root = dadgar_home()?;
        Ok(Self {
            config: root.join("config.toml"),
            db: root.join("db"),
            db_file: root.join("db/dadgar.db"),
            root,
        })
    }

    /// Create all directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create dadgar root")?;
        fs::create_dir_all(&self.db).context("Failed to create db directory")?;
        Ok(())
    }

    /// Check if dadgar has been initialized
    pub fn is_initialized(&self) -> bool {
        self.config.exists() && self.db_file.exists()
    }
}

/// Load configuration from disk
pub fn load_config() -> Result<Config> {
    let paths = DadgarPaths::new()?;
    load_config_at(&paths)
}

/// Load configuration from an explicit paths set (used by tests)
pub fn load_config_at(paths: &DadgarPaths) -> Result<Config> {
    if !paths.config.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&paths.config).context("Failed to read config.toml")?;
    toml::from_str(&content).context("Failed to parse config.toml")
}

/// Save configuration to disk
pub fn save_config(paths: &DadgarPaths, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&paths.config, content).context("Failed to write config.toml")?;
    Ok(())
}
