//! Multiple-choice quiz generation from a set of flashcards

use serde::Deserialize;

use super::flashcards::GeneratedCard;
use crate::ai::{generate_json, AiError, LanguageModel};
use crate::db::quizzes::NewQuizQuestion;

pub const OPTIONS_PER_QUESTION: usize = 4;

const SYSTEM: &str = "You are an expert teacher writing assessments. \
Write multiple-choice questions that are challenging but fair.";

#[derive(Deserialize)]
struct Quiz {
  #[serde(default)]
  questions: Vec<NewQuizQuestion>,
}

fn prompt(cards: &[GeneratedCard], count: usize) -> String {
  let cards = cards
    .iter()
    .map(|c| format!("- Pregunta: {}\n  Respuesta: {}", c.question, c.answer))
    .collect::<Vec<_>>()
    .join("\n");
  format!(
    r#"Using the following study cards, write a multiple-choice quiz in Spanish.

Study cards:
{cards}

Rules:
- Generate exactly {count} questions.
- Each question has {OPTIONS_PER_QUESTION} answer options and exactly one is correct.
- Questions and options are based ONLY on the information in the cards.
- Wrong options are plausible but clearly incorrect.

Return the quiz as JSON:
{{
  "questions": [
    {{
      "question": "¿Qué es...?",
      "options": ["Opción A", "Opción B", "Opción C", "Opción D"],
      "correct_answer": "Opción B"
    }}
  ]
}}

"correct_answer" must match one of the "options" exactly.
Return ONLY the JSON, without extra text or markdown."#
  )
}

fn check_question(q: &NewQuizQuestion) -> Result<(), AiError> {
  if q.options.len() != OPTIONS_PER_QUESTION {
    return Err(AiError::Rejected(format!(
      "each question needs exactly {} options",
      OPTIONS_PER_QUESTION
    )));
  }
  if !q.options.contains(&q.correct_answer) {
    return Err(AiError::Rejected(
      "the correct answer must be one of the options".to_string(),
    ));
  }
  Ok(())
}

/// Generate exactly `count` questions, each with four options including the answer
pub async fn generate_quiz(
  model: &dyn LanguageModel,
  cards: &[GeneratedCard],
  count: usize,
) -> Result<Vec<NewQuizQuestion>, AiError> {
  let quiz: Quiz = generate_json(model, &prompt(cards, count), Some(SYSTEM), 0.8).await?;
  if quiz.questions.len() != count {
    return Err(AiError::Rejected(format!(
      "expected {} questions, got {}",
      count,
      quiz.questions.len()
    )));
  }
  quiz.questions.iter().try_for_each(check_question)?;
  Ok(quiz.questions)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::ScriptedModel;

  fn cards() -> Vec<GeneratedCard> {
    vec![GeneratedCard {
      question: "¿Capital de Francia?".into(),
      answer: "París".into(),
    }]
  }

  #[tokio::test]
  async fn test_valid_quiz() {
    let model = ScriptedModel::new([r#"{"questions": [
      {"question": "¿Capital de Francia?", "options": ["Roma", "París", "Lima", "Oslo"], "correct_answer": "París"}
    ]}"#]);

    let questions = generate_quiz(&model, &cards(), 1).await.unwrap();
    assert_eq!(questions[0].correct_answer, "París");
    assert!(model.prompt(0).contains("Respuesta: París"));
  }

  #[tokio::test]
  async fn test_answer_must_be_an_option() {
    let model = ScriptedModel::new([r#"{"questions": [
      {"question": "¿Capital de Francia?", "options": ["Roma", "Berlín", "Lima", "Oslo"], "correct_answer": "París"}
    ]}"#]);
    assert!(matches!(
      generate_quiz(&model, &cards(), 1).await,
      Err(AiError::Rejected(_))
    ));
  }

  #[tokio::test]
  async fn test_option_count_checked() {
    let model = ScriptedModel::new([r#"{"questions": [
      {"question": "¿Capital de Francia?", "options": ["París", "Roma"], "correct_answer": "París"}
    ]}"#]);
    assert!(generate_quiz(&model, &cards(), 1).await.is_err());
  }
}
