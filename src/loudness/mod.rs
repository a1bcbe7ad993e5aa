//! Two-pass loudness normalization
//!
//! The buffer round-trips through WAV files in a private temp directory:
//! a low-pass pass, then an EBU R128 loudness pass that also fixes the output
//! rate, then the result is read back. The directory is removed when the stage
//! returns, on success and failure alike.

mod filter;

pub use filter::{
    ExternalFilter, FfmpegFilter, FilterPass, LOUDNESS_OUTPUT_RATE, LOUDNESS_RANGE,
    LOWPASS_CUTOFF_HZ, TRUE_PEAK_DB,
};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{read_wav, resample, write_wav, AudioBuffer};
use crate::error::{ExportError, Result};

/// Which file feeds the loudness pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowpassMode {
    /// Loudness pass reads the unfiltered input; the low-pass output is
    /// produced but not used downstream
    #[default]
    Independent,
    /// Loudness pass reads the low-pass output
    Chained,
}

/// Loudness stage bound to an external filter
pub struct LoudnessStage<'a> {
    filter: &'a dyn ExternalFilter,
    mode: LowpassMode,
}

impl<'a> LoudnessStage<'a> {
    pub fn new(filter: &'a dyn ExternalFilter, mode: LowpassMode) -> Self {
        Self { filter, mode }
    }

    /// Normalize to `target_lufs`; the result is always at 44100 Hz
    pub fn normalize(&self, buffer: &AudioBuffer, target_lufs: f64) -> Result<AudioBuffer> {
        let workdir = tempfile::Builder::new()
            .prefix("audio-export-")
            .tempdir()?;

        let temp = workdir.path().join("temp.wav");
        write_input(buffer, &temp)?;

        let filtered = self.filter.run_external_filter(
            &temp,
            &FilterPass::lowpass(),
            &workdir.path().join("filtered.wav"),
        )?;

        let loudness_input = match self.mode {
            LowpassMode::Independent => temp.as_path(),
            LowpassMode::Chained => filtered.as_path(),
        };
        let normalized = self.filter.run_external_filter(
            loudness_input,
            &FilterPass::loudnorm(target_lufs),
            &workdir.path().join("normalized.wav"),
        )?;

        let reloaded = read_wav(&normalized).map_err(|e| ExportError::LoudnessToolFailure {
            pass: "loudnorm".to_string(),
            reason: format!("unreadable output: {}", e),
        })?;

        if reloaded.sample_rate() == LOUDNESS_OUTPUT_RATE {
            Ok(reloaded)
        } else {
            log::debug!(
                "loudness output at {} Hz, resampling to {} Hz",
                reloaded.sample_rate(),
                LOUDNESS_OUTPUT_RATE
            );
            resample(reloaded, LOUDNESS_OUTPUT_RATE)
        }
    }
}

/// Stage the buffer for the filter passes
fn write_input(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    write_wav(buffer, path).map_err(|e| ExportError::LoudnessToolFailure {
        pass: "prepare".to_string(),
        reason: format!("could not write {}: {}", path.display(), e),
    })
}

/// Normalize with the default [`LowpassMode`]
pub fn normalize_loudness(
    buffer: &AudioBuffer,
    target_lufs: f64,
    filter: &dyn ExternalFilter,
) -> Result<AudioBuffer> {
    LoudnessStage::new(filter, LowpassMode::default()).normalize(buffer, target_lufs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, SampleWidth};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records each pass and writes the input back out at `output_rate`
    struct RecordingFilter {
        output_rate: u32,
        calls: Mutex<Vec<(String, PathBuf)>>,
        seen_dirs: Mutex<Vec<PathBuf>>,
    }

    impl RecordingFilter {
        fn new(output_rate: u32) -> Self {
            Self {
                output_rate,
                calls: Mutex::new(Vec::new()),
                seen_dirs: Mutex::new(Vec::new()),
            }
        }
    }

    impl ExternalFilter for RecordingFilter {
        fn run_external_filter(
            &self,
            input: &Path,
            pass: &FilterPass,
            output: &Path,
        ) -> Result<PathBuf> {
            self.calls
                .lock()
                .unwrap()
                .push((pass.name().to_string(), input.to_path_buf()));
            if let Some(dir) = output.parent() {
                self.seen_dirs.lock().unwrap().push(dir.to_path_buf());
            }
            let buffer = read_wav(input)?;
            let rate = match pass {
                FilterPass::Loudnorm { .. } => self.output_rate,
                FilterPass::Lowpass { .. } => buffer.sample_rate(),
            };
            write_wav(&resample(buffer, rate)?, output)?;
            Ok(output.to_path_buf())
        }
    }

    /// Fails every pass, remembering where it was asked to write
    #[derive(Default)]
    struct FailingFilter {
        seen_dirs: Mutex<Vec<PathBuf>>,
    }

    impl ExternalFilter for FailingFilter {
        fn run_external_filter(
            &self,
            _: &Path,
            pass: &FilterPass,
            output: &Path,
        ) -> Result<PathBuf> {
            if let Some(dir) = output.parent() {
                self.seen_dirs.lock().unwrap().push(dir.to_path_buf());
            }
            Err(ExportError::LoudnessToolFailure {
                pass: pass.name().to_string(),
                reason: "exit status 1".to_string(),
            })
        }
    }

    fn tone() -> AudioBuffer {
        generate_test_tone(440.0, 0.5, 0.5, 48000, SampleWidth::Bits16)
    }

    #[test]
    fn test_output_rate_is_44100() {
        let filter = RecordingFilter::new(LOUDNESS_OUTPUT_RATE);
        let out = normalize_loudness(&tone(), -14.0, &filter).unwrap();
        assert_eq!(out.sample_rate(), 44100);
        assert_eq!(out.num_frames(), 22050);
    }

    #[test]
    fn test_off_rate_output_is_resampled() {
        let filter = RecordingFilter::new(22050);
        let out = normalize_loudness(&tone(), -14.0, &filter).unwrap();
        assert_eq!(out.sample_rate(), 44100);
    }

    #[test]
    fn test_independent_mode_feeds_original() {
        let filter = RecordingFilter::new(LOUDNESS_OUTPUT_RATE);
        normalize_loudness(&tone(), -14.0, &filter).unwrap();
        let calls = filter.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "lowpass");
        assert_eq!(calls[1].0, "loudnorm");
        assert!(calls[1].1.ends_with("temp.wav"));
    }

    #[test]
    fn test_chained_mode_feeds_filtered() {
        let filter = RecordingFilter::new(LOUDNESS_OUTPUT_RATE);
        LoudnessStage::new(&filter, LowpassMode::Chained)
            .normalize(&tone(), -14.0)
            .unwrap();
        let calls = filter.calls.lock().unwrap();
        assert!(calls[1].1.ends_with("filtered.wav"));
    }

    #[test]
    fn test_tool_failure_propagates() {
        let err = normalize_loudness(&tone(), -14.0, &FailingFilter::default()).unwrap_err();
        assert_eq!(err.error_code(), "LOUDNESS_TOOL_FAILURE");
    }

    #[test]
    fn test_temp_dir_removed_after_failure() {
        let filter = FailingFilter::default();
        assert!(normalize_loudness(&tone(), -14.0, &filter).is_err());
        let dirs = filter.seen_dirs.lock().unwrap();
        assert_eq!(dirs.len(), 1, "first pass fails, second never runs");
        assert!(!dirs[0].exists(), "{} left behind", dirs[0].display());
    }

    #[test]
    fn test_unwritable_input_names_prepare_pass() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_input(&tone(), &dir.path().join("missing").join("temp.wav")).unwrap_err();
        assert_eq!(err.error_code(), "LOUDNESS_TOOL_FAILURE");
        match err {
            ExportError::LoudnessToolFailure { pass, .. } => assert_eq!(pass, "prepare"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_temp_dir_removed() {
        let filter = RecordingFilter::new(LOUDNESS_OUTPUT_RATE);
        normalize_loudness(&tone(), -14.0, &filter).unwrap();
        for dir in filter.seen_dirs.lock().unwrap().iter() {
            assert!(!dir.exists(), "{} left behind", dir.display());
        }
    }
}
