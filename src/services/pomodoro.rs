//! Research recommendations for a Pomodoro study block

use serde::{Deserialize, Serialize};

use crate::ai::{generate_json, AiError, LanguageModel};

const SYSTEM: &str = "You are an expert research assistant. \
Your goal is to point students to high-quality study resources.";

pub const MIN_SUB_TOPICS: usize = 3;
pub const SOURCES_PER_SUB_TOPIC: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
  pub title: String,
  pub url: String,
  #[serde(rename = "type")]
  pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
  pub sub_topic: String,
  pub sources: Vec<Source>,
}

#[derive(Deserialize)]
struct Recommendations {
  #[serde(default)]
  recommendations: Vec<Recommendation>,
}

fn prompt(topic: &str) -> String {
  format!(
    r#"For the main study topic "{topic}", list key sub-topics and high-quality sources to research during a Pomodoro study session.

Rules:
- Between {MIN_SUB_TOPICS} and 5 important sub-topics.
- Exactly {SOURCES_PER_SUB_TOPIC} sources per sub-topic.
- Sources must be relevant, accessible and of mixed types (article, video, documentation).
- URLs must be real.
- Titles and sub-topics in Spanish.

Return JSON:
{{
  "recommendations": [
    {{
      "sub_topic": "Fundamentos de Python",
      "sources": [
        {{"title": "Tutorial oficial de Python", "url": "https://docs.python.org/es/3/tutorial/", "type": "documentation"}}
      ]
    }}
  ]
}}

Return ONLY the JSON, without extra text or markdown."#
  )
}

pub async fn generate_recommendations(
  model: &dyn LanguageModel,
  topic: &str,
) -> Result<Vec<Recommendation>, AiError> {
  let out: Recommendations = generate_json(model, &prompt(topic), Some(SYSTEM), 0.7).await?;
  if out.recommendations.len() < MIN_SUB_TOPICS {
    return Err(AiError::Rejected(format!(
      "at least {} sub-topics are required",
      MIN_SUB_TOPICS
    )));
  }
  if out
    .recommendations
    .iter()
    .any(|r| r.sources.len() != SOURCES_PER_SUB_TOPIC)
  {
    return Err(AiError::Rejected(format!(
      "each sub-topic needs exactly {} sources",
      SOURCES_PER_SUB_TOPIC
    )));
  }
  Ok(out.recommendations)
}
