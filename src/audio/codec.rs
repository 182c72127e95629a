//! PCM16 codec helpers
//!
//! The model backend speaks little-endian 16-bit PCM. Capture produces f32
//! samples in [-1.0, 1.0]; playback consumes the same. These helpers convert
//! between the two, plus the base64 framing used on the live channel.

use anyhow::{Context, Result};
use base64::Engine;

use super::AudioBuffer;

/// Encode f32 samples into little-endian PCM16 bytes.
///
/// Samples are clamped to [-1.0, 1.0] before scaling so an out-of-range
/// capture buffer cannot wrap around.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Encode i16 samples into little-endian PCM16 bytes.
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian PCM16 bytes into a playable buffer.
///
/// A trailing odd byte is ignored rather than rejected; truncated final
/// frames show up in practice when a stream is cut mid-sample.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> AudioBuffer {
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    AudioBuffer {
        samples,
        sample_rate,
        channels,
    }
}

/// Base64-encode PCM bytes for a JSON-framed transport.
pub fn to_wire(pcm: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(pcm)
}

/// Decode base64 PCM bytes received from a JSON-framed transport.
pub fn from_wire(data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Failed to decode base64 audio payload")
}
