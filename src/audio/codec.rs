// PCM conversion between device sample buffers and the wire representation
//
// Outbound: f32 samples -> 16-bit little-endian PCM -> base64 text.
// Inbound: base64 text -> 16-bit little-endian PCM -> f32 samples.
// Both directions are pure and stateless.

use std::time::Duration;

use base64::Engine;

use crate::error::SessionError;

/// A decoded buffer of playable audio at a known sample rate.
///
/// Produced by [`decode_chunk`]; consumed (and released) by the playback
/// scheduler.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono or interleaved f32 samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

impl AudioChunk {
    /// Playback duration of this chunk.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }
}

/// Encode captured f32 samples as base64 PCM16 LE.
///
/// Each sample is scaled by 32768 and truncated to a 16-bit signed
/// integer. The truncation goes through `i32` so values at or beyond
/// full scale wrap the way a native 16-bit store does, matching what the
/// capture device is expected to produce.
pub fn encode_frame(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * 32768.0) as i32 as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(&bytes)
}

/// Decode a base64 PCM16 LE payload into an [`AudioChunk`].
///
/// Fails with [`SessionError::Decode`] if the text is not valid base64 or
/// the decoded byte length is not a multiple of 2.
pub fn decode_chunk(
    encoded: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioChunk, SessionError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| SessionError::Decode(format!("invalid base64: {e}")))?;

    if bytes.len() % 2 != 0 {
        return Err(SessionError::Decode(format!(
            "odd PCM16 byte length: {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(AudioChunk {
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        let encoded = encode_frame(&[0.0, 0.5, -0.5]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 64, 0, 192]); // 0, 16384, -16384
    }

    #[test]
    fn test_full_scale_wraps() {
        // +1.0 scales to 32768, which wraps to -32768 in a 16-bit store.
        let encoded = encode_frame(&[1.0, -1.0]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(bytes, vec![0, 128, 0, 128]);
    }

    #[test]
    fn test_chunk_duration() {
        let chunk = AudioChunk {
            samples: vec![0.0; 12000],
            sample_rate: 24000,
            channels: 1,
        };
        assert!((chunk.duration().as_secs_f64() - 0.5).abs() < 1e-9);
    }
}
