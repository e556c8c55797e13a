//! Text-to-speech narration

use crate::ai::{wav, AiError, LanguageModel};

/// Synthesize `text` and return it as a `data:audio/wav;base64,...` URI
pub async fn narrate(model: &dyn LanguageModel, text: &str) -> Result<String, AiError> {
  let pcm = model.synthesize_speech(text).await?;
  if pcm.is_empty() {
    return Err(AiError::InvalidResponse("speech synthesis returned no audio".into()));
  }
  tracing::debug!(bytes = pcm.len(), "Synthesized speech");
  Ok(wav::speech_data_uri(&pcm))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::ScriptedModel;

  #[tokio::test]
  async fn test_narrate_returns_wav_data_uri() {
    let model = ScriptedModel::new(Vec::<String>::new());
    let uri = narrate(&model, "Hola").await.unwrap();
    assert!(uri.starts_with("data:audio/wav;base64,UklGR"));
  }

  #[tokio::test]
  async fn test_empty_audio_is_an_error() {
    let model = ScriptedModel::new(Vec::<String>::new()).with_speech(Vec::new());
    assert!(narrate(&model, "Hola").await.is_err());
  }
}
