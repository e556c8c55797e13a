//! Educational videos: a narration script from the language model, rendered
//! by a talking-avatar provider

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ai::{generate_json, AiError, AvatarVideo, LanguageModel, TalkStatus};
use crate::config::VideoConfig;

/// Length targets for one video duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
  pub words: usize,
  pub duration_text: &'static str,
  pub max_chars: usize,
}

pub const DURATIONS: [&str; 3] = ["short", "medium", "long"];

/// Limits for `short`, `medium` or `long`; anything else is treated as `medium`
pub fn script_limits(duration: &str) -> ScriptLimits {
  match duration {
    "short" => ScriptLimits {
      words: 200,
      duration_text: "1-2 minutos",
      max_chars: 1000,
    },
    "long" => ScriptLimits {
      words: 700,
      duration_text: "5-10 minutos",
      max_chars: 3500,
    },
    _ => ScriptLimits {
      words: 400,
      duration_text: "3-5 minutos",
      max_chars: 2000,
    },
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoScript {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub script: String,
  #[serde(default)]
  pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedVideo {
  pub video_url: String,
  pub video_id: String,
  pub script: String,
  pub title: String,
  pub key_points: Vec<String>,
  pub estimated_duration: String,
  pub thumbnail_url: Option<String>,
  pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub credits: Option<i64>,
}

/// Cut `text` to `max_chars` characters, marking the cut with "..."
fn truncate_chars(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}

fn script_prompt(topic: &str, limits: &ScriptLimits) -> String {
  format!(
    r#"Write a CONCISE, DIRECT script in Spanish for an educational video about "{topic}".
The script will be narrated aloud, so keep it SHORT and CLEAR.

Targets:
- Duration: {duration}
- Approximate words: {words}
- Maximum characters: {max_chars}

Structure:
1. Introduction (15-20 seconds): an engaging hook.
2. Body (60-70% of the time): a clear explanation of 2-3 main points.
3. Conclusion (10-15 seconds): a short summary.

Style: conversational, short sentences, no unnecessary jargon, address the viewer as "tú".

Return JSON:
{{
  "title": "Concise, catchy title (at most 60 characters)",
  "script": "The full script as one flowing paragraph",
  "key_points": ["Punto 1", "Punto 2", "Punto 3"]
}}

The "script" is continuous narration text: NO section markers, NO inner headings.
Return ONLY the JSON, without extra text or markdown."#,
    duration = limits.duration_text,
    words = limits.words,
    max_chars = limits.max_chars,
  )
}

/// Write the narration script, capped at the duration's character limit
pub async fn generate_script(
  model: &dyn LanguageModel,
  topic: &str,
  duration: &str,
) -> Result<VideoScript, AiError> {
  let limits = script_limits(duration);
  let system = "You are an expert scriptwriter for educational content. \
Write concise, direct scripts for educational videos.";

  let mut script: VideoScript =
    generate_json(model, &script_prompt(topic, &limits), Some(system), 0.8).await?;
  if script.script.trim().is_empty() {
    return Err(AiError::Rejected("no script was generated".to_string()));
  }
  if script.title.trim().is_empty() {
    script.title = format!("Video Educativo: {}", topic);
  }
  script.script = truncate_chars(&script.script, limits.max_chars);
  Ok(script)
}

/// Poll a talk until it is done, fails, or `max_attempts` checks have passed
pub async fn wait_for_talk(
  video: &dyn AvatarVideo,
  talk_id: &str,
  poll_interval: Duration,
  max_attempts: u32,
) -> Result<TalkStatus, AiError> {
  for attempt in 1..=max_attempts {
    let status = video.talk_status(talk_id).await?;
    debug!(talk_id, attempt, max_attempts, status = %status.status, "Checked video status");

    match status.status.as_str() {
      "done" => return Ok(status),
      "error" => {
        let reason = status
          .error
          .map(|e| e.to_string())
          .unwrap_or_else(|| "unknown error".to_string());
        return Err(AiError::VideoFailed(reason));
      }
      _ => tokio::time::sleep(poll_interval).await,
    }
  }
  Err(AiError::VideoTimeout(max_attempts))
}

/// Script, render and wait for a complete video
pub async fn generate_video(
  model: &dyn LanguageModel,
  video: &dyn AvatarVideo,
  config: &VideoConfig,
  topic: &str,
  duration: &str,
) -> Result<GeneratedVideo, AiError> {
  let script = generate_script(model, topic, duration).await?;
  let talk_id = video.create_talk(&script.script).await?;
  info!(talk_id = %talk_id, "Video render started");

  let finished = wait_for_talk(
    video,
    &talk_id,
    Duration::from_millis(config.poll_interval_ms),
    config.max_poll_attempts,
  )
  .await?;
  let video_url = finished
    .result_url
    .ok_or_else(|| AiError::InvalidResponse("finished video has no result_url".into()))?;

  Ok(GeneratedVideo {
    video_url,
    video_id: talk_id,
    script: script.script,
    title: script.title,
    key_points: script.key_points,
    estimated_duration: script_limits(duration).duration_text.to_string(),
    thumbnail_url: finished.thumbnail_url,
    status: "done".to_string(),
  })
}

/// Check that the video provider accepts our credentials
pub async fn test_connection(video: &dyn AvatarVideo) -> ConnectionReport {
  match video.remaining_credits().await {
    Ok(credits) => ConnectionReport {
      success: true,
      message: "Connected to D-ID".to_string(),
      credits,
    },
    Err(e) => ConnectionReport {
      success: false,
      message: format!("Connection error: {}", e),
      credits: None,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ai::Unconfigured;
  use crate::testing::{ScriptedModel, ScriptedVideo};

  fn instant_config() -> VideoConfig {
    VideoConfig {
      poll_interval_ms: 0,
      max_poll_attempts: 3,
      ..Default::default()
    }
  }

  #[test]
  fn test_limits_and_fallback() {
    assert_eq!(script_limits("short").max_chars, 1000);
    assert_eq!(script_limits("long").duration_text, "5-10 minutos");
    assert_eq!(script_limits("weird"), script_limits("medium"));
  }

  #[test]
  fn test_truncate_chars() {
    assert_eq!(truncate_chars("ñandú", 3), "ñan...");
    assert_eq!(truncate_chars("abc", 3), "abc");
  }

  #[tokio::test]
  async fn test_script_is_capped_and_titled() {
    let long = "a".repeat(1500);
    let model = ScriptedModel::new([format!(r#"{{"script": "{}", "key_points": ["x"]}}"#, long)]);
    let script = generate_script(&model, "Volcanes", "short").await.unwrap();
    assert_eq!(script.script.chars().count(), 1003);
    assert!(script.script.ends_with("..."));
    assert_eq!(script.title, "Video Educativo: Volcanes");
    assert!(model.prompt(0).contains("1-2 minutos"));
  }

  #[tokio::test]
  async fn test_generate_video_polls_until_done() {
    let model = ScriptedModel::new([r#"{"title": "Volcanes", "script": "Hola", "key_points": ["Magma"]}"#]);
    let video = ScriptedVideo::new([
      ScriptedVideo::status("created"),
      ScriptedVideo::status("started"),
      ScriptedVideo::done("https://cdn.example/v.mp4"),
    ]);

    let out = generate_video(&model, &video, &instant_config(), "Volcanes", "medium").await.unwrap();
    assert_eq!(out.video_url, "https://cdn.example/v.mp4");
    assert_eq!(out.video_id, "tlk_scripted");
    assert_eq!(out.estimated_duration, "3-5 minutos");
    assert_eq!(out.status, "done");
    assert_eq!(video.scripts.lock().unwrap()[0], "Hola");
  }

  #[tokio::test]
  async fn test_polling_gives_up() {
    let video = ScriptedVideo::new([]);
    let err = wait_for_talk(&video, "tlk", Duration::ZERO, 3).await.unwrap_err();
    assert!(matches!(err, AiError::VideoTimeout(3)));
  }

  #[tokio::test]
  async fn test_render_error() {
    let failed = TalkStatus {
      status: "error".into(),
      error: Some(serde_json::json!({"kind": "FaceError"})),
      ..Default::default()
    };
    let video = ScriptedVideo::new([failed]);
    let err = wait_for_talk(&video, "tlk", Duration::ZERO, 3).await.unwrap_err();
    assert!(matches!(err, AiError::VideoFailed(reason) if reason.contains("FaceError")));
  }

  #[tokio::test]
  async fn test_connection_report() {
    let ok = test_connection(&ScriptedVideo::new([])).await;
    assert!(ok.success);
    assert_eq!(ok.credits, Some(20));

    let down = test_connection(&Unconfigured("D-ID")).await;
    assert!(!down.success);
    assert!(down.message.contains("D-ID is not configured"));
  }
}
