//! WAV file I/O
//!
//! Lossless container used for the loudness round trip, the native `wav`
//! export target and test fixtures. Samples are written at the buffer's own
//! sample width: integer PCM for 8/16/24 bits, IEEE float for 32 bits.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::{AudioBuffer, SampleWidth};
use crate::error::{ExportError, Result};

/// Read a WAV file into an AudioBuffer at its native rate and width
///
/// # Errors
/// * `CorruptFile` - If the file is missing, truncated or not a WAV file
/// * `UnsupportedFormat` - If the bit depth has no matching `SampleWidth`
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|e| ExportError::CorruptFile {
        path: path.to_path_buf(),
        details: format!("Failed to open WAV file: {}", e),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let width = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => SampleWidth::Bits32,
        (SampleFormat::Int, bits) if bits <= 32 => SampleWidth::at_least(bits as u32),
        (format, bits) => {
            return Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
                details: format!("{}-bit {:?} WAV", bits, format),
            })
        }
    };

    let interleaved = read_samples_as_f32(path, reader, spec)?;
    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate, width).map_err(|e| {
        ExportError::CorruptFile {
            path: path.to_path_buf(),
            details: e.to_string(),
        }
    })
}

/// Write an AudioBuffer to a WAV file at the buffer's sample width
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let width = buffer.sample_width();
    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: width.bits(),
        sample_format: if width == SampleWidth::Bits32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let encode_err = |e: hound::Error| ExportError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut writer = WavWriter::create(path, spec).map_err(encode_err)?;
    let full_scale = width.full_scale();

    for sample in buffer.to_interleaved() {
        if width == SampleWidth::Bits32 {
            writer.write_sample(sample).map_err(encode_err)?;
        } else {
            let scaled = (sample as f64 * full_scale)
                .round()
                .clamp(-full_scale, full_scale - 1.0) as i32;
            writer.write_sample(scaled).map_err(encode_err)?;
        }
    }

    writer.finalize().map_err(encode_err)?;
    Ok(())
}

/// Generate a mono sine tone, useful for fixtures
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_secs: f64,
    sample_rate: u32,
    width: SampleWidth,
) -> AudioBuffer {
    let num_frames = (duration_secs * sample_rate as f64).round() as usize;
    let angular_freq = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;
    let samples: Vec<f32> = (0..num_frames)
        .map(|i| amplitude * (angular_freq * i as f64).sin() as f32)
        .collect();

    AudioBuffer::with_format(vec![samples], sample_rate, width)
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Read samples from a WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    path: &Path,
    mut reader: WavReader<R>,
    spec: WavSpec,
) -> Result<Vec<f32>> {
    let corrupt = |e: hound::Error| ExportError::CorruptFile {
        path: path.to_path_buf(),
        details: format!("Failed to read samples: {}", e),
    };

    match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(corrupt),
        SampleFormat::Int => {
            // hound yields every integer width as i32, sign-extended
            let full_scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(corrupt)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
