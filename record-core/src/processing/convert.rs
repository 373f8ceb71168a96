//! Sample format conversion between raw device buffers and the
//! canonical interleaved f32 stream.
//!
//! Conversion to float never clamps; the single clamp happens in
//! [`to_pcm16`] when samples are turned back into integer PCM for
//! storage or streaming, so values are never clamped twice.

use crate::models::format::{DeviceFormat, SampleRepr};

/// Convert a raw device buffer into interleaved f32 samples.
///
/// A silent buffer (as flagged by the device) short-circuits to zeros.
/// Unsupported bit depths also produce zeros rather than failing, so a
/// misreported format degrades to silence instead of killing capture.
pub fn to_float_samples(bytes: &[u8], format: &DeviceFormat, silent: bool) -> Vec<f32> {
    let bytes_per_sample = usize::from(format.bits_per_sample / 8).max(1);
    let count = bytes.len() / bytes_per_sample;

    if silent {
        return vec![0.0; count];
    }

    match (format.repr, format.bits_per_sample) {
        (SampleRepr::Float, 32) => bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        (SampleRepr::Int, 8) => bytes
            .iter()
            .map(|&b| (f32::from(b) - 128.0) / 128.0)
            .collect(),
        (SampleRepr::Int, 16) => bytes
            .chunks_exact(2)
            .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
            .collect(),
        (SampleRepr::Int, 24) => bytes
            .chunks_exact(3)
            .map(|b| {
                // Sign-extend the packed 3-byte group through the top byte.
                let value = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
                value as f32 / 8_388_608.0
            })
            .collect(),
        (SampleRepr::Int, 32) => bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0)
            .collect(),
        _ => vec![0.0; count],
    }
}

/// Convert f32 samples to little-endian 16-bit signed PCM bytes,
/// clamping to [-1.0, 1.0].
pub fn to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
