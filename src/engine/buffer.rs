//! Audio Buffer Management
//!
//! Provides the in-memory audio buffer every pipeline stage works on, plus the
//! level helpers shared by the dynamics stages.

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS level of a set of samples in dB
///
/// Returns -f32::INFINITY for empty or silent input.
pub fn calculate_rms_db<'a, I>(samples: I) -> f32
where
    I: IntoIterator<Item = &'a f32>,
{
    let mut count = 0usize;
    let sum_squares: f64 = samples
        .into_iter()
        .map(|&s| {
            count += 1;
            (s as f64) * (s as f64)
        })
        .sum();

    if count == 0 {
        return f32::NEG_INFINITY;
    }
    linear_to_db((sum_squares / count as f64).sqrt() as f32)
}

// ============================================================================
// Sample Width
// ============================================================================

/// Bit depth of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum SampleWidth {
    Bits8,
    Bits16,
    Bits24,
    Bits32,
}

impl SampleWidth {
    /// Parse a bit depth, rejecting anything outside {8, 16, 24, 32}
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            8 => Ok(SampleWidth::Bits8),
            16 => Ok(SampleWidth::Bits16),
            24 => Ok(SampleWidth::Bits24),
            32 => Ok(SampleWidth::Bits32),
            other => Err(ExportError::invalid_config(
                "bit_depth",
                other,
                "8, 16, 24 or 32",
            )),
        }
    }

    /// Nearest supported width that can hold `bits` without loss
    pub fn at_least(bits: u32) -> Self {
        match bits {
            0..=8 => SampleWidth::Bits8,
            9..=16 => SampleWidth::Bits16,
            17..=24 => SampleWidth::Bits24,
            _ => SampleWidth::Bits32,
        }
    }

    pub fn bits(&self) -> u16 {
        match self {
            SampleWidth::Bits8 => 8,
            SampleWidth::Bits16 => 16,
            SampleWidth::Bits24 => 24,
            SampleWidth::Bits32 => 32,
        }
    }

    /// Width in bytes (`bit_depth / 8`)
    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }

    /// Full-scale integer magnitude, `2^(bits - 1)`
    pub fn full_scale(&self) -> f64 {
        (1u64 << (self.bits() - 1)) as f64
    }
}

impl TryFrom<u16> for SampleWidth {
    type Error = ExportError;

    fn try_from(bits: u16) -> Result<Self> {
        SampleWidth::from_bits(bits)
    }
}

impl From<SampleWidth> for u16 {
    fn from(width: SampleWidth) -> u16 {
        width.bits()
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Decoded audio held in memory for one file
///
/// Samples are non-interleaved 32-bit floats in [-1.0, 1.0], one `Vec` per
/// channel. Every channel has the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<Vec<f32>>,
    sample_rate: u32,
    sample_width: SampleWidth,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(
        num_channels: usize,
        num_frames: usize,
        sample_rate: u32,
        sample_width: SampleWidth,
    ) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_frames]; num_channels.max(1)],
            sample_rate,
            sample_width,
        }
    }

    /// Create a buffer from per-channel sample data
    pub fn from_channels(
        samples: Vec<Vec<f32>>,
        sample_rate: u32,
        sample_width: SampleWidth,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(ExportError::invalid_config(
                "channels",
                0,
                "at least one channel",
            ));
        }
        let frames = samples[0].len();
        if let Some(bad) = samples.iter().find(|ch| ch.len() != frames) {
            return Err(ExportError::invalid_config(
                "channel length",
                bad.len(),
                format!("{} frames in every channel", frames),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
            sample_width,
        })
    }

    /// Create a buffer from interleaved sample data
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
        sample_width: SampleWidth,
    ) -> Result<Self> {
        if num_channels == 0 || interleaved.len() % num_channels != 0 {
            return Err(ExportError::invalid_config(
                "interleaved length",
                interleaved.len(),
                format!("a multiple of {} channels", num_channels),
            ));
        }

        let num_frames = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
            sample_width,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ...)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_frames = self.num_frames();
        let mut interleaved = Vec::with_capacity(self.num_channels() * num_frames);
        for frame in 0..num_frames {
            for channel in &self.samples {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn sample_width(&self) -> SampleWidth {
        self.sample_width
    }

    /// Bytes per frame across all channels
    pub fn frame_width(&self) -> usize {
        self.sample_width.bytes() * self.num_channels()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Duration in milliseconds (`frames * 1000 / sample_rate`)
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.num_frames() as u64 * 1000 / self.sample_rate as u64
    }

    /// Number of frames covering `ms` milliseconds at this buffer's rate
    pub fn frames_for_ms(&self, ms: f64) -> usize {
        (ms * self.sample_rate as f64 / 1000.0).round().max(0.0) as usize
    }

    /// Number of frames covering `secs` seconds at this buffer's rate
    pub fn frames_for_secs(&self, secs: f64) -> usize {
        self.frames_for_ms(secs * 1000.0)
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.iter().map(|ch| ch.as_slice())
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.samples.iter_mut()
    }

    /// Consume the buffer, returning the per-channel sample data
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.samples
    }

    /// Get a sample at the specified frame and channel
    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(frame).copied())
    }

    /// Copy frames `[start, end)` into a new buffer with the same format
    ///
    /// The range is clamped to the buffer bounds.
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioBuffer {
        let len = self.num_frames();
        let end = end.min(len);
        let start = start.min(end);
        AudioBuffer {
            samples: self
                .samples
                .iter()
                .map(|ch| ch[start..end].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
            sample_width: self.sample_width,
        }
    }

    /// Append another buffer's frames to this one
    ///
    /// The other buffer must share channel count and sample rate.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        if other.num_channels() != self.num_channels() {
            return Err(ExportError::invalid_config(
                "channels",
                other.num_channels(),
                format!("{} channels", self.num_channels()),
            ));
        }
        if other.sample_rate != self.sample_rate {
            return Err(ExportError::invalid_config(
                "sample_rate",
                other.sample_rate,
                format!("{} Hz", self.sample_rate),
            ));
        }
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Rebuild the buffer with new contents and format
    ///
    /// Used by the format conversion stage, which is the only place allowed to
    /// change rate or width of a decoded buffer.
    pub(crate) fn with_format(
        samples: Vec<Vec<f32>>,
        sample_rate: u32,
        sample_width: SampleWidth,
    ) -> Self {
        debug_assert!(samples.windows(2).all(|w| w[0].len() == w[1].len()));
        Self {
            samples,
            sample_rate,
            sample_width,
        }
    }

    /// Absolute peak sample value across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak())
    }

    /// RMS level over all channels of frames `[start, end)` in dBFS
    pub fn rms_db_range(&self, start: usize, end: usize) -> f32 {
        let end = end.min(self.num_frames());
        let start = start.min(end);
        calculate_rms_db(self.samples.iter().flat_map(|ch| ch[start..end].iter()))
    }

    /// Multiply every sample by a linear gain
    pub fn apply_linear_gain(&mut self, gain: f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer::from_channels(samples, 1000, SampleWidth::Bits16).unwrap()
    }

    #[test]
    fn test_db_linear_conversion() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
        assert!((linear_to_db(1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_sample_width_parsing() {
        assert_eq!(SampleWidth::from_bits(24).unwrap(), SampleWidth::Bits24);
        assert_eq!(SampleWidth::Bits24.bytes(), 3);
        assert!(SampleWidth::from_bits(12).is_err());
        assert_eq!(SampleWidth::at_least(20), SampleWidth::Bits24);
        assert_eq!(SampleWidth::Bits16.full_scale(), 32768.0);
    }

    #[test]
    fn test_sample_width_serde() {
        let json = serde_json::to_string(&SampleWidth::Bits16).unwrap();
        assert_eq!(json, "16");
        let parsed: std::result::Result<SampleWidth, _> = serde_json::from_str("12");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_buffer_from_channels_rejects_ragged() {
        let result = AudioBuffer::from_channels(
            vec![vec![0.0; 10], vec![0.0; 9]],
            44100,
            SampleWidth::Bits16,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_buffer_interleaved_roundtrip() {
        let interleaved = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer =
            AudioBuffer::from_interleaved(&interleaved, 2, 44100, SampleWidth::Bits16).unwrap();
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.num_frames(), 3);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer::new(1, 48000 * 30, 48000, SampleWidth::Bits16);
        assert_eq!(buffer.duration_ms(), 30_000);
        assert!((buffer.duration_secs() - 30.0).abs() < 1e-9);
        assert_eq!(buffer.frame_width(), 2);
    }

    #[test]
    fn test_slice_and_append() {
        let buffer = create_test_buffer(vec![(0..10).map(|i| i as f32 / 10.0).collect()]);
        let mut head = buffer.slice_frames(0, 3);
        let tail = buffer.slice_frames(8, 100);
        assert_eq!(head.num_frames(), 3);
        assert_eq!(tail.num_frames(), 2);

        head.append(&tail).unwrap();
        assert_eq!(head.channel(0), &[0.0, 0.1, 0.2, 0.8, 0.9]);
    }

    #[test]
    fn test_append_rejects_channel_mismatch() {
        let mut mono = create_test_buffer(vec![vec![0.0; 4]]);
        let stereo = create_test_buffer(vec![vec![0.0; 4], vec![0.0; 4]]);
        assert!(mono.append(&stereo).is_err());
    }

    #[test]
    fn test_peak_and_gain() {
        let mut buffer = create_test_buffer(vec![vec![0.25, -0.5], vec![0.1, 0.0]]);
        assert_eq!(buffer.peak(), 0.5);
        buffer.apply_linear_gain(2.0);
        assert_eq!(buffer.peak(), 1.0);
    }

    #[test]
    fn test_rms_range() {
        let buffer = create_test_buffer(vec![vec![1.0, 1.0, 0.0, 0.0]]);
        assert!(buffer.rms_db_range(0, 2).abs() < 1e-6);
        assert_eq!(buffer.rms_db_range(2, 4), f32::NEG_INFINITY);
    }
}
