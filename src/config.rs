//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/qa.sqlite"
//!
//! [embedding]
//! provider = "local"            # disabled | local | openai | ollama
//! model = "all-minilm-l6-v2"
//!
//! [matching]
//! threshold = 0.5
//! embed_text = "question"       # question | question_and_answer
//! remove = "all"                # all | first
//!
//! [rewrite]
//! provider = "gemini"           # disabled | gemini | openai
//! model = "gemini-2.0-flash"
//! timeout_secs = 10
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [auth]
//! admin_ids = ["371387636"]
//! ```
//!
//! Secrets are never read from this file: API keys come from
//! `OPENAI_API_KEY` and `GEMINI_API_KEY`.

use anyhow::{Context, Result};
use qa_harness_core::models::{EmbedTextPolicy, RemovePolicy};
use qa_harness_core::service::ServiceParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Best similarity must be strictly above this to count as a match.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub embed_text: EmbedTextPolicy,
    #[serde(default)]
    pub remove: RemovePolicy,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            embed_text: EmbedTextPolicy::default(),
            remove: RemovePolicy::default(),
        }
    }
}

fn default_threshold() -> f32 {
    0.5
}

impl MatchingConfig {
    pub fn service_params(&self) -> ServiceParams {
        ServiceParams {
            threshold: self.threshold,
            embed_text: self.embed_text,
            remove_policy: self.remove,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RewriteConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Override for the service endpoint (OpenAI-compatible base URL, or the
    /// Gemini API root).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_rewrite_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeout_secs: default_rewrite_timeout_secs(),
        }
    }
}

fn default_rewrite_timeout_secs() -> u64 {
    10
}

impl RewriteConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Identities allowed to add, remove, list, and clear entries over HTTP.
    #[serde(default)]
    pub admin_ids: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate matching
    if !config.matching.threshold.is_finite() || !(-1.0..=1.0).contains(&config.matching.threshold)
    {
        anyhow::bail!("matching.threshold must be in [-1.0, 1.0]");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, openai, or ollama.",
            other
        ),
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Validate rewrite
    match config.rewrite.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown rewrite provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }
    if config.rewrite.timeout_secs == 0 {
        anyhow::bail!("rewrite.timeout_secs must be > 0");
    }

    Ok(config)
}
