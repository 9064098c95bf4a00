//! Audio decoding
//!
//! Turns raw file bytes into an immutable [`AudioBuffer`]. WAV is the
//! supported container (8/16/24/32-bit PCM and 32-bit float, mono or
//! stereo). The buffer keeps the file's native sample rate; rate matching
//! is the host's concern.

use std::io::{Cursor, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{RackError, Result};

/// Decode in-memory file bytes
///
/// # Errors
/// * `InvalidAudio` - If the bytes are not a readable WAV stream
/// * `UnsupportedFormat` - If the encoding or channel count is not supported
/// * `EmptyAudio` - If the stream holds no samples
pub fn decode_audio(bytes: &[u8]) -> Result<AudioBuffer> {
    if bytes.is_empty() {
        return Err(RackError::InvalidAudio {
            reason: "no data".to_string(),
            source: None,
        });
    }

    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| match e {
        hound::Error::Unsupported => RackError::UnsupportedFormat {
            format: "WAV encoding".to_string(),
        },
        other => RackError::InvalidAudio {
            reason: format!("Failed to parse WAV data: {}", other),
            source: Some(Box::new(other)),
        },
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;

    // Only the default stereo path is routed
    let layout = ChannelLayout::from_count(channels).ok_or_else(|| RackError::UnsupportedFormat {
        format: format!("{}-channel audio (only mono/stereo supported)", channels),
    })?;

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if interleaved.is_empty() {
        return Err(RackError::EmptyAudio);
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)?;
    debug!(
        "[DECODE] {} ch, {} Hz, {:.3}s",
        buffer.channels(),
        buffer.sample_rate,
        buffer.duration_secs()
    );
    Ok(buffer)
}

/// Read a file from disk and decode it
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `Io` - If the file cannot be read
/// * Any error of [`decode_audio`]
pub fn decode_file(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(RackError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }
    let bytes = std::fs::read(path)?;
    decode_audio(&bytes)
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |bits: &str, e: hound::Error| RackError::InvalidAudio {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| invalid("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("16-bit", e)),
            // 24-bit stored as i32 in hound
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("32-bit int", e)),
            _ => Err(RackError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}
