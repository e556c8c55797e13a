//! Flashcard deck generation

use serde::{Deserialize, Serialize};

use crate::ai::{generate_json, AiError, LanguageModel};

const SYSTEM: &str = "You are an expert in the Feynman technique. \
Write study cards in Spanish that teach through simple explanations.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCard {
  pub question: String,
  pub answer: String,
}

#[derive(Deserialize)]
struct Deck {
  #[serde(default)]
  flashcards: Vec<GeneratedCard>,
}

fn prompt(topic: &str, count: usize) -> String {
  format!(
    r#"Generate a set of study cards in Spanish for the topic: {topic}.

Each card has a "question" (front) and an "answer" (back).
- Question and answer have at most 15 words each.
- Explain the concept in plain terms.
- Generate exactly {count} cards.

Return a JSON object with this structure:
{{
  "flashcards": [
    {{
      "question": "¿Qué es la fotosíntesis?",
      "answer": "El proceso que usan las plantas para convertir la luz en energía química."
    }}
  ]
}}

Return ONLY the JSON, without extra text or markdown."#
  )
}

/// Generate exactly `count` cards for `topic`
pub async fn generate_flashcards(
  model: &dyn LanguageModel,
  topic: &str,
  count: usize,
) -> Result<Vec<GeneratedCard>, AiError> {
  let deck: Deck = generate_json(model, &prompt(topic, count), Some(SYSTEM), 0.8).await?;
  if deck.flashcards.len() != count {
    return Err(AiError::Rejected(format!(
      "expected {} flashcards, got {}",
      count,
      deck.flashcards.len()
    )));
  }
  Ok(deck.flashcards)
}
