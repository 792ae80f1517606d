//! TOML configuration.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api"
//! timeout_secs = 30
//!
//! [storage]
//! path = "./data/chunkwise-state.json"
//!
//! [editor]
//! word_limit = 300
//! upload_dir = "../data-source"
//!
//! [chat]
//! default_model = "gpt-5"
//! ```
//!
//! Every section and key is optional. `CHUNKWISE_API_URL`, when set,
//! overrides `api.base_url`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::ChatModel;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "CHUNKWISE_API_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/chunkwise-state.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorConfig {
    /// Word limit used until a load derives one from the chunks.
    #[serde(default = "default_word_limit")]
    pub word_limit: usize,
    #[serde(default = "default_new_chunk_template")]
    pub new_chunk_template: String,
    /// Target directory recorded on queued uploads.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            word_limit: default_word_limit(),
            new_chunk_template: default_new_chunk_template(),
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_word_limit() -> usize {
    300
}
fn default_new_chunk_template() -> String {
    "# New Chunk\n\nStart editing your content here...".to_string()
}
fn default_upload_dir() -> String {
    "../data-source".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatConfig {
    #[serde(default)]
    pub default_model: ChatModel,
}

impl Config {
    /// Defaults only, with the environment override applied.
    pub fn minimal() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }
}

/// Load and validate a config file. A missing file yields [`Config::minimal`].
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };
    config.apply_env();
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let url = config.api.base_url.trim();
    if url.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("api.base_url must be an http(s) URL, got '{}'", url);
    }
    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }
    if config.editor.word_limit == 0 {
        anyhow::bail!("editor.word_limit must be > 0");
    }
    Ok(())
}
