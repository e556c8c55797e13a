//! Generative AI providers.
//!
//! Handlers and services only see the [`LanguageModel`] and [`AvatarVideo`]
//! traits; the concrete Gemini and D-ID clients are chosen at startup.

pub mod did;
pub mod gemini;
pub mod wav;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::{AiConfig, VideoConfig};

pub use did::DidClient;
pub use gemini::GeminiClient;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),

    #[error("could not parse model output as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Output parsed but broke a content rule (wrong item count, etc.)
    #[error("{0}")]
    Rejected(String),

    #[error("video generation failed: {0}")]
    VideoFailed(String),

    #[error("video was not ready after {0} status checks")]
    VideoTimeout(u32),
}

/// Text and speech generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate free text. `system` is prepended as an instruction block.
    async fn generate_text(
        &self,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
    ) -> Result<String, AiError>;

    /// Synthesize speech, returning raw 16-bit mono PCM at 24 kHz
    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, AiError>;
}

/// State of a talking-avatar render
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TalkStatus {
    pub status: String,
    pub result_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error: Option<serde_json::Value>,
}

/// Talking-avatar video rendering
#[async_trait]
pub trait AvatarVideo: Send + Sync {
    /// Submit a script for rendering, returning the provider's talk id
    async fn create_talk(&self, script: &str) -> Result<String, AiError>;

    async fn talk_status(&self, talk_id: &str) -> Result<TalkStatus, AiError>;

    /// Remaining account credits, if the provider reports them
    async fn remaining_credits(&self) -> Result<Option<i64>, AiError>;
}

/// Generate text and parse it as JSON of type `T`
pub async fn generate_json<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: &str,
    system: Option<&str>,
    temperature: f32,
) -> Result<T, AiError> {
    let raw = model.generate_text(prompt, system, temperature).await?;
    parse_model_json(&raw)
}

/// Parse model output as JSON, tolerating a surrounding Markdown code fence
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    Ok(serde_json::from_str(strip_code_fences(raw))?)
}

/// Remove a leading ```` ```json ```` or ```` ``` ```` and a trailing ```` ``` ````
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Stand-in used when a provider has no API key. Every call fails with
/// [`AiError::NotConfigured`].
pub struct Unconfigured(pub &'static str);

#[async_trait]
impl LanguageModel for Unconfigured {
    async fn generate_text(&self, _: &str, _: Option<&str>, _: f32) -> Result<String, AiError> {
        Err(AiError::NotConfigured(self.0))
    }

    async fn synthesize_speech(&self, _: &str) -> Result<Vec<u8>, AiError> {
        Err(AiError::NotConfigured(self.0))
    }
}

#[async_trait]
impl AvatarVideo for Unconfigured {
    async fn create_talk(&self, _: &str) -> Result<String, AiError> {
        Err(AiError::NotConfigured(self.0))
    }

    async fn talk_status(&self, _: &str) -> Result<TalkStatus, AiError> {
        Err(AiError::NotConfigured(self.0))
    }

    async fn remaining_credits(&self) -> Result<Option<i64>, AiError> {
        Err(AiError::NotConfigured(self.0))
    }
}

/// Gemini when an API key is configured, otherwise a stand-in that fails every call
pub fn language_model_from_config(config: &AiConfig) -> Arc<dyn LanguageModel> {
    match GeminiClient::from_config(config) {
        Ok(Some(client)) => Arc::new(client),
        Ok(None) => {
            tracing::warn!("GEMINI_API_KEY not set; AI generation endpoints will fail");
            Arc::new(Unconfigured("Gemini"))
        }
        Err(e) => {
            tracing::error!("Failed to build Gemini client: {}", e);
            Arc::new(Unconfigured("Gemini"))
        }
    }
}

/// D-ID when an API key is configured, otherwise a stand-in that fails every call
pub fn avatar_video_from_config(config: &VideoConfig) -> Arc<dyn AvatarVideo> {
    match DidClient::from_config(config) {
        Ok(Some(client)) => Arc::new(client),
        Ok(None) => {
            tracing::warn!("D_ID_API_KEY not set; video generation will fail");
            Arc::new(Unconfigured("D-ID"))
        }
        Err(e) => {
            tracing::error!("Failed to build D-ID client: {}", e);
            Arc::new(Unconfigured("D-ID"))
        }
    }
}
