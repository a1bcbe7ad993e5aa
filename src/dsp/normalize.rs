//! Peak normalization
//!
//! One gain factor for the whole file, chosen so the loudest sample lands at
//! the ceiling.

use crate::dsp::effect::Effect;
use crate::engine::buffer::db_to_linear;
use crate::engine::AudioBuffer;

/// Headroom left below full scale, in dB
pub const DEFAULT_HEADROOM_DB: f32 = 0.1;

/// Scales the buffer so its absolute peak reaches `-headroom_db` dBFS
#[derive(Debug, Clone)]
pub struct PeakNormalizer {
    headroom_db: f32,
}

impl PeakNormalizer {
    pub fn new() -> Self {
        Self::with_headroom(DEFAULT_HEADROOM_DB)
    }

    pub fn with_headroom(headroom_db: f32) -> Self {
        Self {
            headroom_db: headroom_db.max(0.0),
        }
    }

    /// Linear peak level the normalizer targets
    pub fn ceiling(&self) -> f32 {
        db_to_linear(-self.headroom_db)
    }
}

impl Default for PeakNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for PeakNormalizer {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        let peak = buffer.peak();
        // Digital silence has no meaningful gain
        if peak <= 0.0 || !peak.is_finite() {
            return;
        }
        buffer.apply_linear_gain(self.ceiling() / peak);
    }
}

/// Peak-normalize to the default ceiling
pub fn normalize_peak(mut buffer: AudioBuffer) -> AudioBuffer {
    PeakNormalizer::new().process(&mut buffer);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, SampleWidth};
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_boosts_to_ceiling() {
        let mut buffer = generate_test_tone(440.0, 0.25, 1.0, 44100, SampleWidth::Bits16);
        let mut normalizer = PeakNormalizer::new();
        normalizer.process(&mut buffer);
        assert_relative_eq!(buffer.peak(), normalizer.ceiling(), epsilon = 1e-6);
        assert_relative_eq!(buffer.peak_db(), -0.1, epsilon = 1e-4);
    }

    #[test]
    fn test_normalize_attenuates_hot_signal() {
        let mut buffer =
            AudioBuffer::from_channels(vec![vec![1.5, -0.75, 0.3]], 1000, SampleWidth::Bits32)
                .unwrap();
        let mut normalizer = PeakNormalizer::new();
        normalizer.process(&mut buffer);
        let ceiling = normalizer.ceiling();
        assert_relative_eq!(buffer.channel(0)[0], ceiling, epsilon = 1e-6);
        assert_relative_eq!(buffer.channel(0)[1], -ceiling / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_silence_unchanged() {
        let mut buffer = AudioBuffer::new(2, 100, 1000, SampleWidth::Bits16);
        let original = buffer.clone();
        PeakNormalizer::new().process(&mut buffer);
        assert_eq!(buffer, original);
    }
}
