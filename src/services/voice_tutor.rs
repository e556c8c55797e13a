//! Conversational tutor: spoken answers plus follow-up questions

use serde::{Deserialize, Serialize};

use super::audio::narrate;
use crate::ai::{generate_json, AiError, LanguageModel};
use crate::db::LogOnError;

/// Suggestions offered when the model cannot produce its own
pub const FALLBACK_SUGGESTIONS: [&str; 3] = [
  "¿Puedes darme un ejemplo práctico?",
  "¿Cómo se relaciona esto con otros conceptos?",
  "¿Cuáles son los errores comunes al aprender esto?",
];

pub const SUGGESTION_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  /// `user` or `assistant`
  pub role: String,
  pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TutorReply {
  pub text_response: String,
  /// WAV data URI of `text_response`
  pub audio_response: String,
  pub follow_up_suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct Suggestions {
  #[serde(default)]
  suggestions: Vec<String>,
}

/// Render the last `limit` messages as a transcript
fn transcript(history: &[ChatMessage], limit: usize) -> String {
  let start = history.len().saturating_sub(limit);
  history[start..]
    .iter()
    .map(|m| {
      let speaker = if m.role == "user" { "Estudiante" } else { "Tutor" };
      format!("{}: {}", speaker, m.content)
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn answer_prompt(question: &str, context: &str) -> String {
  let context = if context.is_empty() {
    String::new()
  } else {
    format!("Previous conversation:\n{}\n\n", context)
  };
  format!(
    r#"{context}The student asks: "{question}"

Instructions:
- Answer in Spanish, clearly and encouragingly.
- Use analogies or concrete examples when appropriate.
- Adapt the complexity to the student; simplify if you detect confusion.
- At most 150 words, since the answer will be read aloud.
- Keep a warm, conversational tone.

Reply ONLY with the explanation, without mentioning that you are a tutor or an AI."#
  )
}

fn suggestions_prompt(topic: &str, question: &str, answer: &str) -> String {
  format!(
    r#"Given this question about {topic}: "{question}"
And this answer: "{answer}"

Write exactly {SUGGESTION_COUNT} follow-up questions in Spanish that a student could ask to go deeper.

Return JSON:
{{
  "suggestions": ["¿Pregunta 1?", "¿Pregunta 2?", "¿Pregunta 3?"]
}}

Return ONLY the JSON, without extra text or markdown."#
  )
}

async fn follow_ups(model: &dyn LanguageModel, topic: &str, question: &str, answer: &str) -> Vec<String> {
  let generated = generate_json::<Suggestions>(model, &suggestions_prompt(topic, question, answer), None, 0.7)
    .await
    .log_warn("Follow-up suggestions failed, using defaults");
  match generated {
    Some(s) if !s.suggestions.is_empty() => s.suggestions,
    _ => FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
  }
}

/// Answer `question`, narrate the answer and propose follow-ups.
/// Only the last `context_messages` entries of `history` reach the model.
pub async fn ask(
  model: &dyn LanguageModel,
  topic: &str,
  question: &str,
  history: &[ChatMessage],
  context_messages: usize,
) -> Result<TutorReply, AiError> {
  let system = format!(
    "You are an expert, patient and encouraging tutor specialized in {}. \
Your goal is to help the student understand concepts clearly.",
    topic
  );
  let prompt = answer_prompt(question, &transcript(history, context_messages));

  let text_response = model.generate_text(&prompt, Some(&system), 0.8).await?;
  let audio_response = narrate(model, &text_response).await?;
  let follow_up_suggestions = follow_ups(model, topic, question, &text_response).await;

  Ok(TutorReply {
    text_response,
    audio_response,
    follow_up_suggestions,
  })
}
