//! Run configuration
//!
//! Built once per invocation from CLI flags, optionally seeded from a JSON
//! preset, validated, then passed into the pipeline by reference.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::SampleWidth;
use crate::error::{ExportError, Result};
use crate::export::{Bitrate, ExportFormat, ExportSpec};
use crate::loudness::LowpassMode;
use crate::tool::DEFAULT_FFMPEG;

/// Input extensions picked up by the batch walker
pub const DEFAULT_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Explicit offset/length window, whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub offset_s: u32,
    pub length_s: u32,
}

/// Which effects to apply; an absent value skips the stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectRequest {
    pub end_silence_threshold_s: Option<f64>,
    pub trim: Option<TrimWindow>,
    pub fade_duration_s: Option<f64>,
    pub normalize: bool,
    pub compress: bool,
    pub target_lufs: Option<f64>,
}

impl EffectRequest {
    pub fn validate(&self) -> Result<()> {
        check_duration("end_silence", self.end_silence_threshold_s)?;
        check_duration("fade", self.fade_duration_s)?;
        if let Some(lufs) = self.target_lufs {
            if !lufs.is_finite() || lufs > 0.0 {
                return Err(ExportError::invalid_config(
                    "lufs",
                    lufs,
                    "a finite loudness at or below 0 LUFS (e.g. -14)",
                ));
            }
        }
        Ok(())
    }

    /// True when no stage besides conversion and export will run
    pub fn is_empty(&self) -> bool {
        *self == EffectRequest::default()
    }
}

fn check_duration(param: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(secs) if !secs.is_finite() || secs < 0.0 => Err(ExportError::invalid_config(
            param,
            secs,
            "a non-negative number of seconds",
        )),
        _ => Ok(()),
    }
}

/// Everything one batch run needs
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub effects: EffectRequest,
    pub export: ExportSpec,
    /// Worker threads; 1 processes files in order on one thread
    pub jobs: usize,
    /// ffmpeg executable used for the loudness and lossy encode passes
    pub ffmpeg: PathBuf,
    pub lowpass_mode: LowpassMode,
    /// Wall-clock limit per external tool invocation
    pub tool_timeout: Option<Duration>,
    /// Lowercase input extensions, without the dot
    pub extensions: Vec<String>,
}

impl RunConfig {
    /// Config with default runtime settings for the given effects and export
    pub fn new(effects: EffectRequest, export: ExportSpec) -> Self {
        Self {
            effects,
            export,
            jobs: 1,
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            lowpass_mode: LowpassMode::default(),
            tool_timeout: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.effects.validate()?;
        self.export.validate()?;
        if self.jobs == 0 {
            return Err(ExportError::invalid_config("jobs", 0, "at least 1"));
        }
        if self.extensions.is_empty() {
            return Err(ExportError::invalid_config(
                "extensions",
                "[]",
                "at least one input extension",
            ));
        }
        if self.tool_timeout == Some(Duration::ZERO) {
            return Err(ExportError::invalid_config(
                "tool_timeout",
                0,
                "a positive number of seconds",
            ));
        }
        Ok(())
    }

    /// Case-insensitive extension filter
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Optional settings loaded from a JSON preset file
///
/// Every field may be omitted; command-line flags take precedence over
/// whatever the preset sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preset {
    pub effects: EffectRequest,
    pub format: Option<ExportFormat>,
    pub bitrate: Option<Bitrate>,
    pub sample_rate_khz: Option<f64>,
    pub bit_depth: Option<SampleWidth>,
    pub jobs: Option<usize>,
    pub ffmpeg: Option<PathBuf>,
    pub lowpass_mode: Option<LowpassMode>,
    pub tool_timeout_s: Option<f64>,
    pub extensions: Option<Vec<String>>,
}

impl Preset {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|source| ExportError::Preset {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
