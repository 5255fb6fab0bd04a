// Unit tests for the PCM codec
//
// These verify the f32 <-> PCM16 <-> base64 conversions and their error
// handling for malformed inbound payloads.

use base64::Engine;
use parla_live::{decode_chunk, encode_frame, SessionError};

#[test]
fn test_round_trip_within_quantization_error() {
    let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 500.0) - 1.0).collect();

    let encoded = encode_frame(&samples);
    let chunk = decode_chunk(&encoded, 16000, 1).unwrap();

    assert_eq!(chunk.samples.len(), samples.len());
    for (original, decoded) in samples.iter().zip(chunk.samples.iter()) {
        assert!(
            (original - decoded).abs() <= 1.0 / 32768.0 + f32::EPSILON,
            "sample {original} decoded as {decoded}"
        );
    }
}

#[test]
fn test_encode_is_little_endian_pcm16() {
    let encoded = encode_frame(&[0.0, 0.5]);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&encoded)
        .unwrap();

    // 0.0 -> 0x0000, 0.5 -> 16384 = 0x4000, little-endian
    assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x40]);
}

#[test]
fn test_decode_rejects_invalid_base64() {
    let err = decode_chunk("not base64!!", 24000, 1).unwrap_err();
    assert!(matches!(err, SessionError::Decode(_)));
}

#[test]
fn test_decode_rejects_odd_byte_length() {
    // Three raw bytes is not a whole number of PCM16 samples.
    let encoded = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
    let err = decode_chunk(&encoded, 24000, 1).unwrap_err();
    assert!(matches!(err, SessionError::Decode(_)));
}

#[test]
fn test_decoded_chunk_duration() {
    let encoded = encode_frame(&vec![0.1; 12000]);
    let chunk = decode_chunk(&encoded, 24000, 1).unwrap();

    assert_eq!(chunk.sample_rate, 24000);
    assert_eq!(chunk.channels, 1);
    assert!((chunk.duration().as_secs_f64() - 0.5).abs() < 1e-9);
}

#[test]
fn test_decode_empty_payload() {
    let chunk = decode_chunk("", 24000, 1).unwrap();
    assert!(chunk.samples.is_empty());
    assert_eq!(chunk.duration().as_secs_f64(), 0.0);
}

#[test]
fn test_decode_recovers_negative_samples() {
    let encoded = encode_frame(&[-0.25, -1.0]);
    let chunk = decode_chunk(&encoded, 16000, 1).unwrap();

    assert!((chunk.samples[0] + 0.25).abs() <= 1.0 / 32768.0);
    assert!((chunk.samples[1] + 1.0).abs() <= 1.0 / 32768.0);
}
