//! External filter port and its ffmpeg implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ExportError, Result};
use crate::tool::ToolCommand;

/// Low-pass cutoff applied before loudness normalization
pub const LOWPASS_CUTOFF_HZ: u32 = 15_000;

/// Maximum true peak after loudness normalization, in dBTP
pub const TRUE_PEAK_DB: f64 = -1.0;

/// Target loudness range, in LU
pub const LOUDNESS_RANGE: f64 = 11.0;

/// Sample rate of the loudness-normalized output
pub const LOUDNESS_OUTPUT_RATE: u32 = 44_100;

/// One pass through the external filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterPass {
    Lowpass {
        cutoff_hz: u32,
    },
    Loudnorm {
        target_lufs: f64,
        true_peak_db: f64,
        loudness_range: f64,
        output_rate: u32,
    },
}

impl FilterPass {
    pub fn lowpass() -> Self {
        FilterPass::Lowpass {
            cutoff_hz: LOWPASS_CUTOFF_HZ,
        }
    }

    /// EBU R128 pass with the fixed true peak, range and output rate
    pub fn loudnorm(target_lufs: f64) -> Self {
        FilterPass::Loudnorm {
            target_lufs,
            true_peak_db: TRUE_PEAK_DB,
            loudness_range: LOUDNESS_RANGE,
            output_rate: LOUDNESS_OUTPUT_RATE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterPass::Lowpass { .. } => "lowpass",
            FilterPass::Loudnorm { .. } => "loudnorm",
        }
    }

    /// ffmpeg arguments between the input and output paths
    pub fn ffmpeg_args(&self) -> Vec<String> {
        match self {
            FilterPass::Lowpass { cutoff_hz } => {
                vec!["-af".to_string(), format!("lowpass=f={}", cutoff_hz)]
            }
            FilterPass::Loudnorm {
                target_lufs,
                true_peak_db,
                loudness_range,
                output_rate,
            } => vec![
                "-af".to_string(),
                format!(
                    "loudnorm=I={}:TP={}:LRA={}",
                    target_lufs, true_peak_db, loudness_range
                ),
                "-ar".to_string(),
                output_rate.to_string(),
            ],
        }
    }
}

/// Runs a filter pass from one file to another
///
/// Implementations return the path of the produced file. Any failure,
/// including a missing output, is a `LoudnessToolFailure`.
pub trait ExternalFilter: Send + Sync {
    fn run_external_filter(&self, input: &Path, pass: &FilterPass, output: &Path)
        -> Result<PathBuf>;
}

/// ffmpeg subprocess filter
#[derive(Debug, Clone, Default)]
pub struct FfmpegFilter {
    tool: ToolCommand,
}

impl FfmpegFilter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            tool: ToolCommand::new(program),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool = self.tool.with_timeout(timeout);
        self
    }

    fn arguments(input: &Path, pass: &FilterPass, output: &Path) -> Vec<String> {
        let mut args = vec!["-i".to_string(), input.display().to_string()];
        args.extend(pass.ffmpeg_args());
        args.push("-y".to_string());
        args.push(output.display().to_string());
        args
    }
}

impl ExternalFilter for FfmpegFilter {
    fn run_external_filter(
        &self,
        input: &Path,
        pass: &FilterPass,
        output: &Path,
    ) -> Result<PathBuf> {
        let failure = |reason: String| ExportError::LoudnessToolFailure {
            pass: pass.name().to_string(),
            reason,
        };

        self.tool
            .run(Self::arguments(input, pass, output))
            .map_err(failure)?;

        if !output.is_file() {
            return Err(failure(format!(
                "no output written to {}",
                output.display()
            )));
        }
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_args() {
        assert_eq!(
            FilterPass::lowpass().ffmpeg_args(),
            vec!["-af", "lowpass=f=15000"]
        );
    }

    #[test]
    fn test_loudnorm_args() {
        assert_eq!(
            FilterPass::loudnorm(-14.0).ffmpeg_args(),
            vec!["-af", "loudnorm=I=-14:TP=-1:LRA=11", "-ar", "44100"]
        );
        assert_eq!(
            FilterPass::loudnorm(-16.5).ffmpeg_args()[1],
            "loudnorm=I=-16.5:TP=-1:LRA=11"
        );
    }

    #[test]
    fn test_full_command_line() {
        let args = FfmpegFilter::arguments(
            Path::new("in.wav"),
            &FilterPass::lowpass(),
            Path::new("out.wav"),
        );
        assert_eq!(args, vec!["-i", "in.wav", "-af", "lowpass=f=15000", "-y", "out.wav"]);
    }

    #[test]
    fn test_missing_binary_is_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let filter = FfmpegFilter::new(dir.path().join("no-ffmpeg-here"));
        let err = filter
            .run_external_filter(
                &dir.path().join("in.wav"),
                &FilterPass::loudnorm(-14.0),
                &dir.path().join("out.wav"),
            )
            .unwrap_err();
        match err {
            ExportError::LoudnessToolFailure { pass, .. } => assert_eq!(pass, "loudnorm"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_output_is_failure() {
        // `true` exits 0 but writes nothing
        let dir = tempfile::tempdir().unwrap();
        let filter = FfmpegFilter::new("true");
        let err = filter
            .run_external_filter(
                &dir.path().join("in.wav"),
                &FilterPass::lowpass(),
                &dir.path().join("out.wav"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("no output"));
    }
}
