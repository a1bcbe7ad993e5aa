//! Linear fade in / fade out
//!
//! Amplitude ramps from 0 to 1 over the first `duration` and from 1 to 0 over
//! the last `duration`. When the ramps overlap on a short track both gains
//! apply, multiplied together.

use crate::dsp::effect::Effect;
use crate::engine::AudioBuffer;

/// Symmetric fade in/out envelope
#[derive(Debug, Clone)]
pub struct Fader {
    duration_s: f64,
}

impl Fader {
    pub fn new(duration_s: f64) -> Self {
        Self {
            duration_s: duration_s.max(0.0),
        }
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }
}

impl Effect for Fader {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        let ramp = buffer.frames_for_secs(self.duration_s);
        if ramp == 0 {
            return;
        }

        let len = buffer.num_frames();
        let ramp_f = ramp as f32;
        let fade_out_start = len.saturating_sub(ramp);

        for channel in buffer.channels_mut() {
            for (i, sample) in channel.iter_mut().enumerate().take(ramp) {
                *sample *= i as f32 / ramp_f;
            }
            for (i, sample) in channel.iter_mut().enumerate().skip(fade_out_start) {
                *sample *= (len - 1 - i) as f32 / ramp_f;
            }
        }
    }
}

/// Apply a fade in and fade out of `fade_duration_s` seconds
pub fn apply_fade(mut buffer: AudioBuffer, fade_duration_s: f64) -> AudioBuffer {
    Fader::new(fade_duration_s).process(&mut buffer);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SampleWidth;
    use approx::assert_relative_eq;

    fn dc(frames: usize) -> AudioBuffer {
        AudioBuffer::from_channels(vec![vec![1.0; frames]; 2], 100, SampleWidth::Bits16).unwrap()
    }

    #[test]
    fn test_zero_fade_is_identity() {
        let buffer = dc(500);
        assert_eq!(apply_fade(buffer.clone(), 0.0), buffer);
    }

    #[test]
    fn test_fade_ramps() {
        let faded = apply_fade(dc(1000), 1.0);
        let ch = faded.channel(0);
        assert_eq!(ch[0], 0.0);
        assert_relative_eq!(ch[50], 0.5);
        assert_eq!(ch[100], 1.0);
        assert_eq!(ch[500], 1.0);
        assert_relative_eq!(ch[949], 0.5);
        assert_eq!(ch[999], 0.0);
        assert_eq!(faded.channel(1), ch);
    }

    #[test]
    fn test_fade_is_linear() {
        let faded = apply_fade(dc(1000), 1.0);
        let ch = faded.channel(0);
        for i in 1..100 {
            assert_relative_eq!(ch[i] - ch[i - 1], 0.01, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_overlapping_ramps_multiply() {
        // 1.5 s track with 1 s fades: the middle frames get both ramps
        let faded = apply_fade(dc(150), 1.0);
        let ch = faded.channel(0);
        let i = 75;
        let expected = (i as f32 / 100.0) * ((150 - 1 - i) as f32 / 100.0);
        assert_relative_eq!(ch[i], expected);
        assert_eq!(ch[0], 0.0);
        assert_eq!(ch[149], 0.0);
    }

    #[test]
    fn test_fade_longer_than_track() {
        let faded = apply_fade(dc(10), 5.0);
        assert!(faded.channel(0).iter().all(|s| *s >= 0.0 && *s < 0.01));
        assert_eq!(faded.num_frames(), 10);
    }
}
