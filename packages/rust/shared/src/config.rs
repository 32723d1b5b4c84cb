//! Application configuration for Pressmark.
//!
//! User config lives at `~/.pressmark/pressmark.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PressError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pressmark.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pressmark";

// ---------------------------------------------------------------------------
// Config structs (matching pressmark.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completion enrichment settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the chat-completion API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model to use for enrichment.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Delimiter the model is asked to separate tags with.
    #[serde(default = "default_tag_delimiter")]
    pub tag_delimiter: String,

    /// Natural language prompts ask the model to answer in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            tag_delimiter: default_tag_delimiter(),
            language: default_language(),
        }
    }
}

fn default_api_key_env() -> String {
    "SILICON_FLOW_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.siliconflow.cn/v1".into()
}
fn default_model() -> String {
    "Qwen/Qwen3-8B".into()
}
fn default_tag_delimiter() -> String {
    ",".into()
}
fn default_language() -> String {
    "Simplified Chinese".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory formatted markdown files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Property used as the output file name.
    #[serde(default = "default_filename_field")]
    pub filename_field: String,

    /// Property keys left out of the frontmatter.
    #[serde(default = "default_frontmatter_exclude")]
    pub frontmatter_exclude: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            filename_field: default_filename_field(),
            frontmatter_exclude: default_frontmatter_exclude(),
        }
    }
}

fn default_output_dir() -> String {
    "./src/content/blog".into()
}
fn default_filename_field() -> String {
    "urlname".into()
}
fn default_frontmatter_exclude() -> Vec<String> {
    vec!["status".into(), "urlname".into()]
}

// ---------------------------------------------------------------------------
// Enrichment settings (runtime, resolved once at startup)
// ---------------------------------------------------------------------------

/// Runtime enrichment settings — config file values plus the API key read
/// from the environment. Immutable once built.
#[derive(Clone)]
pub struct EnrichmentSettings {
    /// API key for the chat-completion backend.
    pub api_key: String,
    /// Base URL of the chat-completion API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Tag delimiter.
    pub tag_delimiter: String,
    /// Prompt language.
    pub language: String,
}

impl std::fmt::Debug for EnrichmentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("tag_delimiter", &self.tag_delimiter)
            .field("language", &self.language)
            .finish()
    }
}

impl EnrichmentSettings {
    /// Combine the `[enrichment]` section with an API key.
    pub fn new(config: &EnrichmentConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.clone(),
            model: config.default_model.clone(),
            tag_delimiter: config.tag_delimiter.clone(),
            language: config.language.clone(),
        }
    }

    /// Read the API key from the environment variable named in config.
    ///
    /// Returns `None` when the variable is unset or empty: enrichment is
    /// skipped rather than treated as an error.
    pub fn from_env(config: &AppConfig) -> Option<Self> {
        let var_name = &config.enrichment.api_key_env;
        match std::env::var(var_name) {
            Ok(key) if !key.trim().is_empty() => {
                tracing::debug!(var = %var_name, "enrichment API key found");
                Some(Self::new(&config.enrichment, key))
            }
            _ => {
                tracing::debug!(var = %var_name, "enrichment API key not set, enrichment disabled");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pressmark/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PressError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pressmark/pressmark.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PressError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PressError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PressError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
