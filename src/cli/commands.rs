//! CLI command implementations

use std::time::Duration;

use log::info;

use crate::cli::Cli;
use crate::engine::SampleWidth;
use crate::error::{ExportError, Result};
use crate::export::{Bitrate, ExportSpec};
use crate::loudness::LowpassMode;
use crate::pipeline::{BatchReport, BatchRunner, Pipeline, Preset, RunConfig, TrimWindow};
use crate::tool::DEFAULT_FFMPEG;

/// Merge flags over the optional preset into a validated [`RunConfig`]
pub fn build_config(cli: &Cli) -> Result<RunConfig> {
    let preset = match &cli.preset {
        Some(path) => {
            info!("Loading preset {}", path.display());
            Preset::load(path)?
        }
        None => Preset::default(),
    };

    let format = cli
        .format
        .or(preset.format)
        .ok_or_else(|| missing("format", "one of ogg, m4a, mp3, wav"))?;
    let bitrate = match &cli.bitrate {
        Some(raw) => Bitrate::parse(raw)?,
        None => preset
            .bitrate
            .ok_or_else(|| missing("bitrate", "a bitrate such as 128k"))?,
    };
    let sample_rate_khz = cli
        .sample_rate
        .or(preset.sample_rate_khz)
        .ok_or_else(|| missing("sample_rate", "a rate in kHz such as 44.1"))?;
    let bit_depth = match cli.bit_depth {
        Some(bits) => Some(SampleWidth::from_bits(bits)?),
        None => preset.bit_depth,
    };

    let mut effects = preset.effects;
    if let Some(threshold) = cli.end_silence {
        effects.end_silence_threshold_s = Some(threshold);
    }
    if let Some(window) = &cli.trim {
        effects.trim = Some(trim_window(window)?);
    }
    if let Some(fade) = cli.fade {
        effects.fade_duration_s = Some(fade);
    }
    effects.normalize |= cli.normalize;
    effects.compress |= cli.compress;
    if let Some(lufs) = cli.lufs {
        effects.target_lufs = Some(lufs);
    }

    let mut config = RunConfig::new(
        effects,
        ExportSpec {
            format,
            bitrate,
            sample_rate_khz,
            bit_depth,
        },
    );
    config.jobs = cli.jobs.or(preset.jobs).unwrap_or(1);
    config.ffmpeg = cli
        .ffmpeg
        .clone()
        .or(preset.ffmpeg)
        .unwrap_or_else(|| DEFAULT_FFMPEG.into());
    config.lowpass_mode = if cli.chain_lowpass {
        LowpassMode::Chained
    } else {
        preset.lowpass_mode.unwrap_or_default()
    };
    config.tool_timeout = cli
        .tool_timeout
        .or(preset.tool_timeout_s)
        .map(timeout)
        .transpose()?;
    if let Some(extensions) = preset.extensions {
        config.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
    }

    config.validate()?;
    Ok(config)
}

/// Run the batch described by `cli` and write the report if requested
pub fn run(cli: &Cli) -> Result<BatchReport> {
    let config = build_config(cli)?;
    info!(
        "Exporting {} -> {} as {} ({}, {} kHz)",
        cli.input_folder.display(),
        cli.output_folder.display(),
        config.export.format,
        config.export.bitrate,
        config.export.sample_rate_khz
    );

    let pipeline = Pipeline::new(config)?;
    let runner = BatchRunner::new(pipeline, &cli.input_folder, &cli.output_folder);
    let report = runner.run()?;

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        info!("Report written to {}", path.display());
    }
    Ok(report)
}

fn missing(param: &str, expected: &str) -> ExportError {
    ExportError::invalid_config(param, "<missing>", expected)
}

fn trim_window(values: &[u32]) -> Result<TrimWindow> {
    match values {
        [offset_s, length_s] => Ok(TrimWindow {
            offset_s: *offset_s,
            length_s: *length_s,
        }),
        other => Err(ExportError::invalid_config(
            "trim",
            format!("{:?}", other),
            "OFFSET LENGTH",
        )),
    }
}

fn timeout(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ExportError::invalid_config(
            "tool_timeout",
            secs,
            "a positive number of seconds",
        ));
    }
    Ok(Duration::from_secs_f64(secs))
}
