//! Configuration loading and root folder resolution
//!
//! Two layers:
//! - `AiConfig`: the settings blob every analyzer consults before doing work.
//!   It is persisted in the database `settings` table and can be seeded from TOML.
//! - `TomlConfig`: the on-disk service configuration (root folder, logging,
//!   mediator bind address, and an `[ai]` section).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default inference service endpoint (Ollama-compatible)
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:11434";

/// Default chat model
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Per-feature switches of the suggestion pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Analyze visible posts of an account
    pub content_analysis: bool,
    /// Record interactions and analyze them
    pub pattern_recognition: bool,
    /// Compute a suggestion as soon as the annotation menu opens
    pub auto_suggest: bool,
}

/// Settings blob for the suggestion pipeline
///
/// Passed explicitly into every analyzer, the recorder and the scanner;
/// a settings change is applied through their `reconfigure` calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    /// Master switch; when off no inference request is ever issued
    pub enabled: bool,
    /// Base URL of the inference service
    #[serde(alias = "ollamaUrl")]
    pub service_url: String,
    /// Model name sent with every chat request
    pub model: String,
    pub features: FeatureFlags,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_url: DEFAULT_SERVICE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            features: FeatureFlags::default(),
        }
    }
}

impl AiConfig {
    /// Content analysis runs only when both the master switch and the feature are on
    pub fn content_analysis_active(&self) -> bool {
        self.enabled && self.features.content_analysis
    }

    /// Pattern recognition runs only when both the master switch and the feature are on
    pub fn pattern_recognition_active(&self) -> bool {
        self.enabled && self.features.pattern_recognition
    }

    /// Auto-suggest requires at least one analyzer to be active
    pub fn auto_suggest_active(&self) -> bool {
        self.features.auto_suggest
            && (self.content_analysis_active() || self.pattern_recognition_active())
    }

    /// Reject settings that can never produce a request
    pub fn validate(&self) -> Result<()> {
        let url = self.service_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "serviceUrl must be an http(s) URL, got '{}'",
                self.service_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Service URL without trailing slash, ready for path concatenation
    pub fn base_url(&self) -> &str {
        self.service_url.trim().trim_end_matches('/')
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Bind address and transport limits of the mediator service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on one inference round trip (transport-level only)
    pub request_timeout_secs: u64,
    /// Service base URLs the mediator may contact. Empty means any URL a
    /// caller names, so keep `host` on loopback when leaving it empty.
    pub allowed_services: Vec<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5790,
            request_timeout_secs: 120,
            allowed_services: Vec::new(),
        }
    }
}

impl BrokerConfig {
    /// Base URL the pipeline uses to reach the mediator
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// On-disk configuration file (`~/.config/xat/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub broker: BrokerConfig,
    pub ai: AiConfig,
}

/// Load TOML configuration
///
/// A missing file is not an error: defaults are returned and a warning logged.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write TOML configuration atomically (temp file + rename in the same directory)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Default configuration file path for the platform
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("xat").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("xat.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = toml_config.and_then(|c| c.root_folder.clone()) {
        return root;
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("xat"))
        .unwrap_or_else(|| PathBuf::from("./xat_data"))
}

/// Database file inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("xat.db")
}
