//! D-ID talking-avatar client (`/talks`, `/credits`).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{AiError, AvatarVideo, TalkStatus};
use crate::config::VideoConfig;

#[derive(Clone)]
pub struct DidClient {
  client: reqwest::Client,
  base_url: String,
  /// Precomputed `Basic` credentials (API key as user, empty password)
  authorization: String,
  voice_id: String,
  source_url: String,
}

impl DidClient {
  /// Construct the client if an API key is configured; otherwise return None.
  pub fn from_config(config: &VideoConfig) -> Result<Option<Self>, reqwest::Error> {
    let Some(api_key) = config.d_id_api_key.as_deref() else {
      return Ok(None);
    };
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Some(Self {
      client,
      base_url: config.d_id_base_url.trim_end_matches('/').to_string(),
      authorization: basic_auth(api_key),
      voice_id: config.voice_id.clone(),
      source_url: config.source_url.clone(),
    }))
  }

  async fn check(res: reqwest::Response) -> Result<reqwest::Response, AiError> {
    if res.status().is_success() {
      return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(AiError::Status { status, body })
  }
}

fn basic_auth(api_key: &str) -> String {
  let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:", api_key));
  format!("Basic {}", encoded)
}

#[async_trait]
impl AvatarVideo for DidClient {
  #[instrument(level = "info", skip(self, script), fields(chars = script.len()))]
  async fn create_talk(&self, script: &str) -> Result<String, AiError> {
    let req = CreateTalk {
      script: TalkScript {
        kind: "text",
        input: script,
        provider: VoiceProvider { kind: "microsoft", voice_id: &self.voice_id },
      },
      source_url: &self.source_url,
    };

    let res = self
      .client
      .post(format!("{}/talks", self.base_url))
      .header(AUTHORIZATION, &self.authorization)
      .header(ACCEPT, "application/json")
      .json(&req)
      .send()
      .await?;
    let created: CreatedTalk = Self::check(res).await?.json().await?;
    info!(talk_id = %created.id, "D-ID talk created");
    Ok(created.id)
  }

  async fn talk_status(&self, talk_id: &str) -> Result<TalkStatus, AiError> {
    let res = self
      .client
      .get(format!("{}/talks/{}", self.base_url, talk_id))
      .header(AUTHORIZATION, &self.authorization)
      .header(ACCEPT, "application/json")
      .send()
      .await?;
    Ok(Self::check(res).await?.json().await?)
  }

  async fn remaining_credits(&self) -> Result<Option<i64>, AiError> {
    let res = self
      .client
      .get(format!("{}/credits", self.base_url))
      .header(AUTHORIZATION, &self.authorization)
      .header(ACCEPT, "application/json")
      .timeout(Duration::from_secs(10))
      .send()
      .await?;
    let credits: Credits = Self::check(res).await?.json().await?;
    Ok(credits.remaining)
  }
}

// ---- wire types ----

#[derive(Serialize)]
struct CreateTalk<'a> {
  script: TalkScript<'a>,
  source_url: &'a str,
}

#[derive(Serialize)]
struct TalkScript<'a> {
  #[serde(rename = "type")]
  kind: &'a str,
  input: &'a str,
  provider: VoiceProvider<'a>,
}

#[derive(Serialize)]
struct VoiceProvider<'a> {
  #[serde(rename = "type")]
  kind: &'a str,
  voice_id: &'a str,
}

#[derive(Deserialize)]
struct CreatedTalk {
  id: String,
}

#[derive(Deserialize)]
struct Credits {
  remaining: Option<i64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_basic_auth_uses_empty_password() {
    // base64("key:")
    assert_eq!(basic_auth("key"), "Basic a2V5Og==");
  }

  #[test]
  fn test_create_talk_body() {
    let req = CreateTalk {
      script: TalkScript {
        kind: "text",
        input: "Hola",
        provider: VoiceProvider { kind: "microsoft", voice_id: "es-ES-ElviraNeural" },
      },
      source_url: "https://example.com/alice.jpg",
    };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["script"]["type"], "text");
    assert_eq!(json["script"]["provider"]["voice_id"], "es-ES-ElviraNeural");
    assert_eq!(json["source_url"], "https://example.com/alice.jpg");
  }

  #[test]
  fn test_status_parsing() {
    let status: TalkStatus = serde_json::from_str(
      r#"{"id":"tlk_1","status":"done","result_url":"https://x/video.mp4","thumbnail_url":null}"#,
    )
    .unwrap();
    assert_eq!(status.status, "done");
    assert_eq!(status.result_url.as_deref(), Some("https://x/video.mp4"));
  }

  #[test]
  fn test_no_key_means_no_client() {
    assert!(DidClient::from_config(&VideoConfig::default()).unwrap().is_none());
  }
}
