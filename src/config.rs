use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Markdown knowledge source tree scanned by the ingestion pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

/// Length bounds for header-aware chunking. All limits are byte lengths.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_section_chars")]
    pub max_section_chars: usize,
    #[serde(default = "default_max_bucket_chars")]
    pub max_bucket_chars: usize,
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_section_chars: default_max_section_chars(),
            max_bucket_chars: default_max_bucket_chars(),
            min_section_chars: default_min_section_chars(),
        }
    }
}

fn default_max_section_chars() -> usize {
    1500
}
fn default_max_bucket_chars() -> usize {
    1200
}
fn default_min_section_chars() -> usize {
    50
}

/// Remote embedding backend. The API key comes from the `DEEPSEEK_API_KEY`
/// environment variable; without it every embedding is computed locally.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            dims: default_dims(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.deepseek.com".to_string()
}
fn default_model() -> String {
    "deepseek-chat".to_string()
}
fn default_dims() -> usize {
    1024
}
fn default_timeout_secs() -> u64 {
    30
}

/// Downstream workflow webhook that receives the enhanced prompt.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.min_section_chars == 0 {
        anyhow::bail!("chunking.min_section_chars must be > 0");
    }

    if config.chunking.max_bucket_chars <= config.chunking.min_section_chars {
        anyhow::bail!("chunking.max_bucket_chars must be > chunking.min_section_chars");
    }

    if config.chunking.max_section_chars < config.chunking.max_bucket_chars {
        anyhow::bail!("chunking.max_section_chars must be >= chunking.max_bucket_chars");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.source.include_globs.is_empty() {
        anyhow::bail!("source.include_globs must not be empty");
    }

    Ok(config)
}
