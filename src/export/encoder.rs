//! Encoder port and implementations

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{write_wav, AudioBuffer};
use crate::error::{ExportError, Result};
use crate::tool::ToolCommand;

/// Writes a buffer into a container at a bitrate
pub trait Encoder: Send + Sync {
    fn encode(
        &self,
        buffer: &AudioBuffer,
        container: &str,
        bitrate: &str,
        path: &Path,
    ) -> Result<()>;
}

/// Encodes through an ffmpeg subprocess
///
/// The buffer is first written as a WAV at its own sample width into a temp
/// directory, then transcoded into the requested container. ffmpeg writes to a
/// `.partial` sibling that is renamed over the destination only on success,
/// so a failed encode leaves nothing at `path`. `wav` never goes through
/// ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    tool: ToolCommand,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            tool: ToolCommand::new(program),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool = self.tool.with_timeout(timeout);
        self
    }

    fn arguments(input: &Path, container: &str, bitrate: &str, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.display().to_string(),
            "-f".to_string(),
            container.to_string(),
            "-b:a".to_string(),
            bitrate.to_string(),
            "-y".to_string(),
            output.display().to_string(),
        ]
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        buffer: &AudioBuffer,
        container: &str,
        bitrate: &str,
        path: &Path,
    ) -> Result<()> {
        if container == "wav" {
            return WavEncoder.encode(buffer, container, bitrate, path);
        }

        let workdir = tempfile::Builder::new()
            .prefix("audio-export-enc-")
            .tempdir()?;
        let source = workdir.path().join("source.wav");
        write_wav(buffer, &source)?;

        let partial = partial_path(path);
        let result = self
            .tool
            .run(Self::arguments(&source, container, bitrate, &partial))
            .map_err(|reason| ExportError::Encode {
                path: path.to_path_buf(),
                reason,
            })
            .and_then(|()| {
                if !partial.is_file() {
                    return Err(ExportError::Encode {
                        path: path.to_path_buf(),
                        reason: "encoder produced no output".to_string(),
                    });
                }
                fs::rename(&partial, path).map_err(ExportError::from)
            });

        if result.is_err() {
            discard_partial(&partial);
        }
        result
    }
}

/// Sibling path the encoder writes before the final rename
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn discard_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => log::debug!("removed partial output {}", partial.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not remove {}: {}", partial.display(), e),
    }
}

/// Native PCM WAV writer
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl Encoder for WavEncoder {
    fn encode(&self, buffer: &AudioBuffer, container: &str, _: &str, path: &Path) -> Result<()> {
        if container != "wav" {
            return Err(ExportError::Encode {
                path: path.to_path_buf(),
                reason: format!("WAV encoder cannot write {} containers", container),
            });
        }
        write_wav(buffer, path)
    }
}
