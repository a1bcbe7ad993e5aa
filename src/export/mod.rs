//! Export stage
//!
//! Maps the logical format onto a container, makes sure the destination
//! directory exists and hands the buffer to an [`Encoder`].

mod encoder;
mod format;

pub use encoder::{Encoder, FfmpegEncoder, WavEncoder};
pub use format::{Bitrate, ExportFormat};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{AudioBuffer, SampleWidth};
use crate::error::{ExportError, Result};

/// Target format, bitrate, sample rate and optional bit depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpec {
    pub format: ExportFormat,
    pub bitrate: Bitrate,
    pub sample_rate_khz: f64,
    #[serde(default)]
    pub bit_depth: Option<SampleWidth>,
}

impl ExportSpec {
    pub fn validate(&self) -> Result<()> {
        crate::engine::khz_to_hz(self.sample_rate_khz).map(|_| ())
    }
}

/// Writes buffers to disk through an encoder
pub struct Exporter<'a> {
    encoder: &'a dyn Encoder,
}

impl<'a> Exporter<'a> {
    pub fn new(encoder: &'a dyn Encoder) -> Self {
        Self { encoder }
    }

    /// Encode `buffer` to `output_path`, creating missing parent directories
    pub fn export(&self, buffer: &AudioBuffer, spec: &ExportSpec, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        log::debug!(
            "encoding {} as {} at {}",
            output_path.display(),
            spec.format.container(),
            spec.bitrate
        );
        self.encoder
            .encode(
                buffer,
                spec.format.container(),
                spec.bitrate.as_str(),
                output_path,
            )
            .map_err(|e| match e {
                ExportError::Encode { .. } => e,
                other => ExportError::Encode {
                    path: output_path.to_path_buf(),
                    reason: other.to_string(),
                },
            })
    }
}
