//! Sample rate and bit depth conversion
//!
//! Final shaping step before export. Resampling is always applied; bit depth
//! conversion only when a target depth was requested.

use crate::engine::buffer::{AudioBuffer, SampleWidth};
use crate::error::{ExportError, Result};

/// Convert a rate given in kHz to whole Hz (`round(khz * 1000)`)
pub fn khz_to_hz(khz: f64) -> Result<u32> {
    let hz = (khz * 1000.0).round();
    if !hz.is_finite() || hz < 1.0 || hz > u32::MAX as f64 {
        return Err(ExportError::invalid_config(
            "sample_rate",
            khz,
            "a positive rate in kHz (e.g. 44.1)",
        ));
    }
    Ok(hz as u32)
}

/// Resample to `target_sample_rate_khz` and optionally requantize
pub fn convert(
    buffer: AudioBuffer,
    target_sample_rate_khz: f64,
    target_bit_depth: Option<SampleWidth>,
) -> Result<AudioBuffer> {
    let target_rate = khz_to_hz(target_sample_rate_khz)?;
    let resampled = resample(buffer, target_rate)?;
    Ok(match target_bit_depth {
        Some(width) => requantize(resampled, width),
        None => resampled,
    })
}

/// Resample every channel to `target_rate`
pub fn resample(buffer: AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    let source_rate = buffer.sample_rate();
    if source_rate == target_rate {
        return Ok(buffer);
    }
    if source_rate == 0 {
        return Err(ExportError::Resample {
            reason: "source buffer has a sample rate of 0 Hz".to_string(),
        });
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let channels = buffer
        .channels()
        .map(|channel| resample_linear(channel, ratio))
        .collect();

    Ok(AudioBuffer::with_format(
        channels,
        target_rate,
        buffer.sample_width(),
    ))
}

/// Snap every sample onto the integer grid of `width` and record the new width
pub fn requantize(mut buffer: AudioBuffer, width: SampleWidth) -> AudioBuffer {
    // 32-bit output is float; the grid is finer than f32 precision
    if width != SampleWidth::Bits32 {
        let full_scale = width.full_scale();
        for channel in buffer.channels_mut() {
            for sample in channel.iter_mut() {
                let q = (*sample as f64 * full_scale)
                    .round()
                    .clamp(-full_scale, full_scale - 1.0);
                *sample = (q / full_scale) as f32;
            }
        }
    }

    let rate = buffer.sample_rate();
    AudioBuffer::with_format(buffer.into_channels(), rate, width)
}

/// Linear interpolation resampling
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else {
            samples[source_len - 1]
        };

        output.push(sample);
    }

    output
}
