//! Google Gemini REST client (generateContent).
//!
//! Calls are instrumented and log model names and response sizes (not contents).
//! The API key is sent as a header and never logged.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{AiError, LanguageModel};
use crate::config::AiConfig;

#[derive(Clone)]
pub struct GeminiClient {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
  model: String,
  tts_model: String,
  tts_voice: String,
}

impl GeminiClient {
  /// Construct the client if an API key is configured; otherwise return None.
  pub fn from_config(config: &AiConfig) -> Result<Option<Self>, reqwest::Error> {
    let Some(api_key) = config.gemini_api_key.clone() else {
      return Ok(None);
    };
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()?;

    Ok(Some(Self {
      client,
      api_key,
      base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
      model: config.gemini_model.clone(),
      tts_model: config.tts_model.clone(),
      tts_voice: config.tts_voice.clone(),
    }))
  }

  async fn generate_content(&self, model: &str, req: &GenerateRequest<'_>) -> Result<GenerateResponse, AiError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, model);
    let res = self
      .client
      .post(&url)
      .header("x-goog-api-key", &self.api_key)
      .json(req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let body = extract_error_message(&body).unwrap_or(body);
      return Err(AiError::Status { status, body });
    }

    let body: GenerateResponse = res.json().await?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, output_tokens = ?usage.candidates_token_count, "Gemini usage");
    }
    Ok(body)
  }
}

#[async_trait]
impl LanguageModel for GeminiClient {
  #[instrument(level = "info", skip(self, prompt, system), fields(model = %self.model))]
  async fn generate_text(&self, prompt: &str, system: Option<&str>, temperature: f32) -> Result<String, AiError> {
    let full_prompt = match system {
      Some(system) => format!("{}\n\n{}", system.trim(), prompt),
      None => prompt.to_string(),
    };
    let req = GenerateRequest {
      contents: vec![Content { role: Some("user"), parts: vec![Part::text(&full_prompt)] }],
      generation_config: GenerationConfig {
        temperature: Some(temperature),
        top_p: Some(0.95),
        top_k: Some(40),
        max_output_tokens: Some(8192),
        response_modalities: None,
        speech_config: None,
      },
    };

    let body = self.generate_content(&self.model, &req).await?;
    let text: String = body
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()).collect())
      .unwrap_or_default();

    if text.trim().is_empty() {
      return Err(AiError::InvalidResponse("no text in response".into()));
    }
    info!(chars = text.len(), "Gemini text generated");
    Ok(text)
  }

  #[instrument(level = "info", skip(self, text), fields(model = %self.tts_model, voice = %self.tts_voice))]
  async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, AiError> {
    let req = GenerateRequest {
      contents: vec![Content { role: Some("user"), parts: vec![Part::text(text)] }],
      generation_config: GenerationConfig {
        response_modalities: Some(vec!["AUDIO"]),
        speech_config: Some(SpeechConfig {
          voice_config: VoiceConfig {
            prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: &self.tts_voice },
          },
        }),
        ..GenerationConfig::default()
      },
    };

    let body = self.generate_content(&self.tts_model, &req).await?;
    let data = body
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()))
      .map(|inline| inline.data.as_str())
      .ok_or_else(|| AiError::InvalidResponse("no audio in response".into()))?;

    let pcm = base64::engine::general_purpose::STANDARD
      .decode(data)
      .map_err(|e| AiError::InvalidResponse(format!("audio is not valid base64: {}", e)))?;
    info!(bytes = pcm.len(), "Gemini speech generated");
    Ok(pcm)
  }
}

fn extract_error_message(body: &str) -> Option<String> {
  let v: serde_json::Value = serde_json::from_str(body).ok()?;
  v.get("error")?.get("message")?.as_str().map(str::to_string)
}

// ---- wire types ----

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
  contents: Vec<Content<'a>>,
  generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<&'a str>,
  parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
  text: &'a str,
}

impl<'a> Part<'a> {
  fn text(text: &'a str) -> Self {
    Self { text }
  }
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  top_p: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  top_k: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_output_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_modalities: Option<Vec<&'a str>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  speech_config: Option<SpeechConfig<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
  voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
  prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
  voice_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
  content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
  #[serde(default)]
  parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
  text: Option<String>,
  inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
  data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  prompt_token_count: Option<u32>,
  candidates_token_count: Option<u32>,
}
