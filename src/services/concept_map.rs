//! Concept maps in Mermaid `graph TD` syntax

use serde::Deserialize;

use crate::ai::{generate_json, AiError, LanguageModel};

const SYSTEM: &str = "You are an expert at building concept maps with Mermaid syntax.";

/// Characters Mermaid chokes on inside a `[label]`
const LABEL_BREAKERS: &[char] = &['(', ')', '/', '#'];

#[derive(Deserialize)]
struct Generated {
  #[serde(default)]
  mermaid_graph: String,
}

fn prompt(topic: &str) -> String {
  format!(
    r#"Build a concept map in Mermaid syntax for the topic: {topic}.

MOST IMPORTANT RULE: text inside nodes (between '[brackets]') must NEVER contain the characters ( ) / #

Rules:
- Produce a Mermaid 'graph TD' diagram with node labels in Spanish.
- Connect between 5 and 10 key concepts.
- Link concepts with 'A --> B'. Do NOT put text on the links.
- To separate words inside a node use spaces or hyphens: write 'A[Nodo - Concepto 1]' instead of 'A[Nodo/Concepto(1)]'.
- The result is a single valid Mermaid string.

Return JSON:
{{
  "mermaid_graph": "graph TD; A[Tema Principal]; B[Concepto Clave 1]; A --> B;"
}}

Return ONLY the JSON, without extra text or markdown."#
  )
}

/// Strip `( ) / #` from every non-empty `[...]` label
pub fn sanitize_mermaid_graph(graph: &str) -> String {
  let mut out = String::with_capacity(graph.len());
  let mut rest = graph;
  while let Some(open) = rest.find('[') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    match after.find(']') {
      Some(close) if close > 0 => {
        out.push('[');
        out.extend(after[..close].chars().filter(|c| !LABEL_BREAKERS.contains(c)));
        out.push(']');
        rest = &after[close + 1..];
      }
      _ => {
        out.push('[');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

pub async fn generate_concept_map(model: &dyn LanguageModel, topic: &str) -> Result<String, AiError> {
  let generated: Generated = generate_json(model, &prompt(topic), Some(SYSTEM), 0.7).await?;
  if generated.mermaid_graph.trim().is_empty() {
    return Err(AiError::Rejected("no concept map was generated".to_string()));
  }
  Ok(sanitize_mermaid_graph(&generated.mermaid_graph))
}
