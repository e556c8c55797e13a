//! Motivational copy following the AIDA model (attention, interest, desire)

use serde::{Deserialize, Serialize};

use crate::ai::{generate_json, AiError, LanguageModel};

const SYSTEM: &str = "You are an expert in educational marketing and motivation. \
Your goal is to write copy that inspires students to learn.";

pub const DESIRE_ITEMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AidaContent {
  #[serde(default)]
  pub attention: String,
  #[serde(default)]
  pub interest: String,
  #[serde(default)]
  pub desire: Vec<String>,
}

fn prompt(topic: &str) -> String {
  format!(
    r#"For the topic "{topic}", write motivational copy in Spanish following the AIDA model.

Rules:
- attention: a counterintuitive question or surprising fact. At most 15 words.
- interest: a short paragraph connecting the topic to something familiar. At most 50 words.
- desire: a list of exactly {DESIRE_ITEMS} direct, actionable benefits.

Return JSON:
{{
  "attention": "¿Sabías que...?",
  "interest": "...",
  "desire": ["...", "...", "..."]
}}

Return ONLY the JSON, without extra text or markdown."#
  )
}

pub async fn generate_engagement(
  model: &dyn LanguageModel,
  topic: &str,
) -> Result<AidaContent, AiError> {
  let content: AidaContent = generate_json(model, &prompt(topic), Some(SYSTEM), 0.9).await?;
  if content.attention.trim().is_empty()
    || content.interest.trim().is_empty()
    || content.desire.len() != DESIRE_ITEMS
  {
    return Err(AiError::Rejected("incomplete AIDA content".to_string()));
  }
  Ok(content)
}
