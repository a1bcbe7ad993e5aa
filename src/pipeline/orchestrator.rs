//! Per-file pipeline
//!
//! Decode, run the planned effect stages, convert, export. Every step is
//! timed and the result of a file is always a [`FileReport`], never an error:
//! one bad input cannot stop a batch.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::dsp::{
    apply_fade, compress_dynamic_range, normalize_peak, trim_range, trim_trailing_silence,
    ClampWarning,
};
use crate::engine::{convert, AudioBuffer, Decoder, SymphoniaDecoder};
use crate::error::{ExportError, Result};
use crate::export::{Encoder, Exporter, FfmpegEncoder};
use crate::loudness::{ExternalFilter, FfmpegFilter, LoudnessStage};
use crate::pipeline::config::RunConfig;
use crate::pipeline::stage::{plan, Operation, PlannedStage};

/// How a file ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Exported,
    Failed {
        code: String,
        message: String,
        hint: String,
    },
}

impl Outcome {
    fn failed(error: &ExportError) -> Self {
        Outcome::Failed {
            code: error.error_code().to_string(),
            message: error.to_string(),
            hint: error.recovery_hint().to_string(),
        }
    }

    pub fn is_exported(&self) -> bool {
        matches!(self, Outcome::Exported)
    }
}

/// Wall-clock time spent in one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed: Duration,
}

/// Result of processing one input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: Outcome,
    pub timings: Vec<StageTiming>,
    pub warnings: Vec<ClampWarning>,
    pub elapsed: Duration,
}

impl FileReport {
    pub fn is_exported(&self) -> bool {
        self.outcome.is_exported()
    }
}

/// Shared, immutable pipeline: configuration plus the external ports
pub struct Pipeline {
    config: RunConfig,
    stages: Vec<PlannedStage>,
    decoder: Box<dyn Decoder>,
    encoder: Box<dyn Encoder>,
    filter: Box<dyn ExternalFilter>,
}

impl Pipeline {
    /// Pipeline with the symphonia decoder and ffmpeg-backed encoder/filter
    pub fn new(config: RunConfig) -> Result<Self> {
        let encoder = FfmpegEncoder::new(&config.ffmpeg).with_timeout(config.tool_timeout);
        let filter = FfmpegFilter::new(&config.ffmpeg).with_timeout(config.tool_timeout);
        Self::with_components(
            config,
            Box::new(SymphoniaDecoder::new()),
            Box::new(encoder),
            Box::new(filter),
        )
    }

    /// Pipeline with caller-supplied ports
    pub fn with_components(
        config: RunConfig,
        decoder: Box<dyn Decoder>,
        encoder: Box<dyn Encoder>,
        filter: Box<dyn ExternalFilter>,
    ) -> Result<Self> {
        config.validate()?;
        let stages = plan(&config.effects);
        Ok(Self {
            config,
            stages,
            decoder,
            encoder,
            filter,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process one file; failures are captured in the report
    pub fn process_file(&self, input: &Path, output: &Path) -> FileReport {
        let started = Instant::now();
        let mut timings = Vec::new();
        let mut warnings = Vec::new();

        let outcome = match self.run(input, output, &mut timings, &mut warnings) {
            Ok(()) => {
                log::info!("Exported: {}", output.display());
                Outcome::Exported
            }
            Err(e) => {
                log::error!("Failed: {}: {} ({})", input.display(), e, e.error_code());
                Outcome::failed(&e)
            }
        };

        let elapsed = started.elapsed();
        log::info!(
            "File processed in {:.2} seconds",
            elapsed.as_secs_f64()
        );

        FileReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            outcome,
            timings,
            warnings,
            elapsed,
        }
    }

    fn run(
        &self,
        input: &Path,
        output: &Path,
        timings: &mut Vec<StageTiming>,
        warnings: &mut Vec<ClampWarning>,
    ) -> Result<()> {
        log::info!("Processing: {}", input.display());

        let mut buffer = timed(timings, "decode", || self.decoder.decode(input))?;
        log::info!(
            " - Channels: {}, Sample Rate: {} Hz, Bit Width: {} bit, Frame Width: {} bytes",
            buffer.num_channels(),
            buffer.sample_rate(),
            buffer.sample_width().bits(),
            buffer.frame_width()
        );

        for stage in &self.stages {
            let Some(op) = stage.operation() else {
                continue;
            };
            log::info!("{}", op);
            buffer = timed(timings, stage.kind.name(), || {
                self.apply(op, buffer, warnings)
            })?;
        }

        let export = &self.config.export;
        let buffer = timed(timings, "convert", || {
            convert(buffer, export.sample_rate_khz, export.bit_depth)
        })?;

        timed(timings, "export", || {
            Exporter::new(self.encoder.as_ref()).export(&buffer, export, output)
        })?;
        log::info!(
            " - Format: {}, Bitrate: {}, Sample Rate: {} kHz, Bit Depth: {} bit",
            export.format,
            export.bitrate,
            export.sample_rate_khz,
            buffer.sample_width().bits()
        );
        Ok(())
    }

    fn apply(
        &self,
        op: &Operation,
        buffer: AudioBuffer,
        warnings: &mut Vec<ClampWarning>,
    ) -> Result<AudioBuffer> {
        Ok(match *op {
            Operation::SilenceTrim { threshold_s } => trim_trailing_silence(buffer, threshold_s),
            Operation::RangeTrim(window) => {
                let outcome = trim_range(buffer, window.offset_s, window.length_s);
                if let Some(warning) = outcome.warning {
                    log::warn!("{}", warning);
                    warnings.push(warning);
                }
                outcome.buffer
            }
            Operation::Fade { duration_s } => apply_fade(buffer, duration_s),
            Operation::Normalize => normalize_peak(buffer),
            Operation::Compress => compress_dynamic_range(buffer),
            Operation::Loudness { target_lufs } => {
                LoudnessStage::new(self.filter.as_ref(), self.config.lowpass_mode)
                    .normalize(&buffer, target_lufs)?
            }
        })
    }
}

/// Run `f`, recording its duration under `stage`
fn timed<T>(
    timings: &mut Vec<StageTiming>,
    stage: &str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed();
    log::debug!("{} took {:.1} ms", stage, elapsed.as_secs_f64() * 1000.0);
    timings.push(StageTiming {
        stage: stage.to_string(),
        elapsed,
    });
    result
}
