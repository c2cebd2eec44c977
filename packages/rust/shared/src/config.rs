//! Application configuration for BotDemo.
//!
//! User config lives at `~/.botdemo/botdemo.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DemoError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "botdemo.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".botdemo";

// ---------------------------------------------------------------------------
// Config structs (matching botdemo.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the site serving `api/documents` and `api/demo/chat`; a path prefix is kept.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the env var holding an optional bearer token (never store the token itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_api_key_env() -> String {
    "BOTDEMO_API_TOKEN".into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Bot used when none is given on the command line.
    #[serde(default = "default_bot")]
    pub bot: String,

    /// Directory of extra bot definitions (`*.toml`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bots_dir: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            bot: default_bot(),
            bots_dir: None,
        }
    }
}

fn default_bot() -> String {
    "legal-expert".into()
}

// ---------------------------------------------------------------------------
// Client config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime backend configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are joined onto.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Bearer token sent with every request, if any.
    pub bearer_token: Option<String>,
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            timeout: Duration::from_secs(config.api.timeout_secs),
            bearer_token: resolve_bearer_token(config),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.botdemo/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DemoError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.botdemo/botdemo.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| DemoError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DemoError::config(format!("failed to parse {}: {e}", path.display())))?;

    url::Url::parse(&config.api.base_url).map_err(|e| {
        DemoError::config(format!("invalid api.base_url '{}': {e}", config.api.base_url))
    })?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DemoError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| DemoError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DemoError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the bearer token from the configured env var, if set and non-empty.
pub fn resolve_bearer_token(config: &AppConfig) -> Option<String> {
    match std::env::var(&config.api.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}
