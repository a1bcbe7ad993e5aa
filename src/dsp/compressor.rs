//! Dynamic range compressor
//!
//! Feed-forward compressor with a peak envelope follower linked across
//! channels and a hard-knee gain computer. Settings are fixed; the export
//! stage only toggles it on or off.

use crate::dsp::effect::Effect;
use crate::engine::buffer::{db_to_linear, linear_to_db};
use crate::engine::AudioBuffer;

/// Fixed compressor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Threshold level in dBFS
    pub threshold_db: f32,
    /// Compression ratio (4.0 = 4:1)
    pub ratio: f32,
    /// Attack time in milliseconds
    pub attack_ms: f32,
    /// Release time in milliseconds
    pub release_ms: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
        }
    }
}

/// Compressor dynamics processor
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    /// Linked peak envelope (linear)
    envelope: f32,
}

impl Compressor {
    pub fn new() -> Self {
        Self::with_params(CompressorParams::default())
    }

    pub fn with_params(params: CompressorParams) -> Self {
        Self {
            params,
            envelope: 0.0,
        }
    }

    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// One-pole smoothing coefficient for a time constant at `sample_rate`
    fn coefficient(time_ms: f32, sample_rate: u32) -> f32 {
        let samples = (time_ms / 1000.0) * sample_rate as f32;
        if samples > 0.0 {
            (-1.0 / samples).exp()
        } else {
            0.0
        }
    }

    /// Gain change in dB (zero or negative) for an input level in dB
    fn compute_gain_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.params.threshold_db;
        if input_db <= threshold {
            0.0
        } else {
            (threshold + (input_db - threshold) / self.params.ratio) - input_db
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Compressor {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        let rate = buffer.sample_rate();
        let attack = Self::coefficient(self.params.attack_ms, rate);
        let release = Self::coefficient(self.params.release_ms, rate);
        let num_channels = buffer.num_channels();

        for frame in 0..buffer.num_frames() {
            // Linked detection: loudest channel drives all of them
            let mut level: f32 = 0.0;
            for ch in 0..num_channels {
                level = level.max(buffer.channel(ch)[frame].abs());
            }

            let coeff = if level > self.envelope { attack } else { release };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let gain = db_to_linear(self.compute_gain_reduction_db(linear_to_db(self.envelope)));
            for ch in 0..num_channels {
                buffer.channel_mut(ch)[frame] *= gain;
            }
        }
    }
}

/// Run the fixed-setting compressor over the whole buffer
pub fn compress_dynamic_range(mut buffer: AudioBuffer) -> AudioBuffer {
    Compressor::new().process(&mut buffer);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, SampleWidth};

    #[test]
    fn test_compressor_default_params() {
        let comp = Compressor::new();
        let params = comp.params();
        assert_eq!(params.threshold_db, -20.0);
        assert_eq!(params.ratio, 4.0);
        assert_eq!(params.attack_ms, 5.0);
        assert_eq!(params.release_ms, 50.0);
    }

    #[test]
    fn test_gain_computer() {
        let comp = Compressor::new();
        assert_eq!(comp.compute_gain_reduction_db(-30.0), 0.0);
        // 20 dB over threshold at 4:1 leaves 5 dB over: 15 dB of reduction
        assert!((comp.compute_gain_reduction_db(0.0) + 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_quiet_signal_untouched() {
        let mut buffer = generate_test_tone(440.0, 0.05, 0.5, 44100, SampleWidth::Bits16);
        let original = buffer.clone();
        Compressor::new().process(&mut buffer);
        for (a, b) in buffer.channel(0).iter().zip(original.channel(0)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_loud_signal_reduced() {
        let mut buffer = generate_test_tone(440.0, 1.0, 1.0, 44100, SampleWidth::Bits16);
        Compressor::new().process(&mut buffer);
        // Past the attack transient
        let settled = buffer.slice_frames(22050, 44100);
        assert!(settled.peak() < 0.5);
        assert!(settled.peak() > 0.05, "compressor must not silence the signal");
    }

    #[test]
    fn test_dynamic_range_reduced() {
        // Loud then quiet section: the gap between them shrinks
        let loud = generate_test_tone(440.0, 0.9, 0.5, 44100, SampleWidth::Bits16);
        let quiet = generate_test_tone(440.0, 0.09, 0.5, 44100, SampleWidth::Bits16);
        let mut buffer = loud.clone();
        buffer.append(&quiet).unwrap();

        Compressor::new().process(&mut buffer);
        let half = loud.num_frames();
        let before = 20.0 * (0.9_f32 / 0.09).log10();
        let after =
            buffer.rms_db_range(half / 2, half) - buffer.rms_db_range(half + half / 2, 2 * half);
        assert!(after < before - 3.0, "range {} dB vs {} dB", after, before);
    }
}
