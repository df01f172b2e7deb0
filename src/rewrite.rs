//! Rewrite service backends.
//!
//! Implementations of the core [`Rewriter`] trait over HTTP:
//! - **[`GeminiRewriter`]**: Google Generative Language `generateContent`.
//! - **[`OpenAIRewriter`]**: any OpenAI-compatible `/chat/completions` endpoint.
//!
//! Neither backend retries. Every failure, including the client timeout,
//! becomes [`QaError::RewriteService`] and the service falls back to the
//! original answer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use qa_harness_core::error::QaError;
use qa_harness_core::rewrite::{build_rewrite_prompt, Rewriter};
use tracing::debug;

use crate::config::RewriteConfig;

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send the request and return the JSON body of a successful response.
async fn send_json(req: reqwest::RequestBuilder, label: &str) -> qa_harness_core::Result<serde_json::Value> {
    let response = req.send().await.map_err(|e| {
        if e.is_timeout() {
            QaError::RewriteService(format!("{} request timed out", label))
        } else {
            QaError::RewriteService(format!("{} request failed: {}", label, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(QaError::RewriteService(format!(
            "{} API error {}: {}",
            label, status, body_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| QaError::RewriteService(format!("{} returned invalid JSON: {}", label, e)))
}

// ============ Gemini ============

/// Rewriter backed by the Gemini `generateContent` API.
///
/// Requires the `GEMINI_API_KEY` environment variable.
pub struct GeminiRewriter {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiRewriter {
    pub fn new(config: &RewriteConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            api_key,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Rewriter for GeminiRewriter {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn rewrite(&self, answer: &str) -> qa_harness_core::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": build_rewrite_prompt(answer) }]
            }]
        });

        let req = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let json = send_json(req, "Gemini").await?;
        debug!(response = %json, "Gemini rewrite response");

        parse_gemini_response(&json)
    }
}

/// Extract `candidates[0].content.parts[0].text`.
fn parse_gemini_response(json: &serde_json::Value) -> qa_harness_core::Result<String> {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            QaError::RewriteService("Invalid Gemini response: missing candidate text".to_string())
        })
}

// ============ OpenAI-compatible ============

/// Rewriter backed by an OpenAI-compatible chat completions endpoint.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIRewriter {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIRewriter {
    pub fn new(config: &RewriteConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            api_key,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Rewriter for OpenAIRewriter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn rewrite(&self, answer: &str) -> qa_harness_core::Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_rewrite_prompt(answer) }],
            "temperature": 0.3,
        });

        let req = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        let json = send_json(req, "OpenAI").await?;

        parse_openai_chat_response(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_openai_chat_response(json: &serde_json::Value) -> qa_harness_core::Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            QaError::RewriteService("Invalid OpenAI response: missing message content".to_string())
        })
}

/// Create the configured rewriter, or `None` when rewriting is disabled.
pub fn create_rewriter(config: &RewriteConfig) -> Result<Option<Arc<dyn Rewriter>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "gemini" => Ok(Some(Arc::new(GeminiRewriter::new(config)?))),
        "openai" => Ok(Some(Arc::new(OpenAIRewriter::new(config)?))),
        other => bail!("Unknown rewrite provider: {}", other),
    }
}
