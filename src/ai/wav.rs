//! WAV container for raw PCM speech.

use base64::Engine;

/// PCM layout produced by speech synthesis
pub const CHANNELS: u16 = 1;
pub const SAMPLE_RATE: u32 = 24_000;
pub const BITS_PER_SAMPLE: u16 = 16;

/// Wrap little-endian PCM samples in a canonical 44-byte RIFF/WAVE header
pub fn pcm_to_wav(pcm: &[u8], channels: u16, sample_rate: u32, bits_per_sample: u16) -> Vec<u8> {
  let block_align = channels * bits_per_sample / 8;
  let byte_rate = sample_rate * block_align as u32;
  let data_len = pcm.len() as u32;

  let mut out = Vec::with_capacity(44 + pcm.len());
  out.extend_from_slice(b"RIFF");
  out.extend_from_slice(&(36 + data_len).to_le_bytes());
  out.extend_from_slice(b"WAVE");

  out.extend_from_slice(b"fmt ");
  out.extend_from_slice(&16u32.to_le_bytes());
  out.extend_from_slice(&1u16.to_le_bytes()); // PCM
  out.extend_from_slice(&channels.to_le_bytes());
  out.extend_from_slice(&sample_rate.to_le_bytes());
  out.extend_from_slice(&byte_rate.to_le_bytes());
  out.extend_from_slice(&block_align.to_le_bytes());
  out.extend_from_slice(&bits_per_sample.to_le_bytes());

  out.extend_from_slice(b"data");
  out.extend_from_slice(&data_len.to_le_bytes());
  out.extend_from_slice(pcm);
  out
}

/// `data:audio/wav;base64,...` URI for synthesized speech
pub fn speech_data_uri(pcm: &[u8]) -> String {
  let wav = pcm_to_wav(pcm, CHANNELS, SAMPLE_RATE, BITS_PER_SAMPLE);
  format!(
    "data:audio/wav;base64,{}",
    base64::engine::general_purpose::STANDARD.encode(wav)
  )
}
