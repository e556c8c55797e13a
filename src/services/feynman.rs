//! Feynman technique: a simple explanation, then feedback on the learner's own

use serde::{Deserialize, Serialize};

use crate::ai::{generate_json, AiError, LanguageModel};

#[derive(Deserialize)]
struct Explanation {
  #[serde(default)]
  explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeynmanFeedback {
  #[serde(default)]
  pub gaps: String,
  #[serde(default)]
  pub simplifications: String,
}

/// Step one: explain the topic as if to a twelve-year-old
pub async fn explain(model: &dyn LanguageModel, topic: &str) -> Result<String, AiError> {
  let system = "You are an expert in the Feynman technique. \
Your goal is to explain complex concepts in a simple, understandable way.";
  let prompt = format!(
    r#"For the topic "{topic}", write a very simple and concise explanation in Spanish,
as if you were explaining it to a 12-year-old. Use analogies where possible.
Do not exceed 100 words.

Return JSON:
{{
  "explanation": "..."
}}

Return ONLY the JSON, without extra text or markdown."#
  );

  let out: Explanation = generate_json(model, &prompt, Some(system), 0.7).await?;
  if out.explanation.trim().is_empty() {
    return Err(AiError::Rejected("no explanation was generated".to_string()));
  }
  Ok(out.explanation)
}

/// Step two: point out gaps and simplifications in the learner's explanation
pub async fn analyze(
  model: &dyn LanguageModel,
  topic: &str,
  user_explanation: &str,
) -> Result<FeynmanFeedback, AiError> {
  let system = "You are a teacher who uses the Feynman technique. \
Your goal is to help students find the gaps in their understanding.";
  let prompt = format!(
    r#"The study topic is "{topic}".
The student's explanation is: "{user_explanation}"

Analyze it and answer in Spanish, in two parts:
1. gaps: 1-2 key gaps or misconceptions. Be direct.
2. simplifications: 1-2 ways to simplify the complex parts.

Start each point with a hyphen (-) and address the student directly.

Return JSON:
{{
  "gaps": "- No mencionaste el rol del núcleo.",
  "simplifications": "- Compara la célula con una pequeña fábrica."
}}

Return ONLY the JSON, without extra text or markdown."#
  );

  let feedback: FeynmanFeedback = generate_json(model, &prompt, Some(system), 0.7).await?;
  if feedback.gaps.trim().is_empty() || feedback.simplifications.trim().is_empty() {
    return Err(AiError::Rejected("the analysis is incomplete".to_string()));
  }
  Ok(feedback)
}
