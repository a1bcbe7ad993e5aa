//! Error handling for the export pipeline
//!
//! Every failure is scoped to one input file. Errors carry a stable code and a
//! recovery hint so the batch report can tell the user what to do next.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum ExportError {
    // Decode Errors
    #[error("Unsupported audio format for {path}: {details}")]
    UnsupportedFormat { path: PathBuf, details: String },

    #[error("Corrupt or unreadable audio file {path}: {details}")]
    CorruptFile { path: PathBuf, details: String },

    // Processing Errors
    #[error("Loudness tool failed during {pass} pass: {reason}")]
    LoudnessToolFailure { pass: String, reason: String },

    #[error("Resampling failed: {reason}")]
    Resample { reason: String },

    // Encode Errors
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {param} = {value} (expected {expected})")]
    InvalidConfig {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Invalid preset file {path}: {source}")]
    Preset {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Shorthand for configuration validation failures
    pub fn invalid_config(
        param: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        ExportError::InvalidConfig {
            param: param.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            ExportError::CorruptFile { .. } => "CORRUPT_FILE",
            ExportError::LoudnessToolFailure { .. } => "LOUDNESS_TOOL_FAILURE",
            ExportError::Resample { .. } => "RESAMPLE_ERROR",
            ExportError::Encode { .. } => "ENCODE_ERROR",
            ExportError::InvalidConfig { .. } => "INVALID_CONFIG",
            ExportError::Preset { .. } => "INVALID_PRESET",
            ExportError::Io(_) => "IO_ERROR",
        }
    }

    /// True for the decode class of failures (unreadable or unsupported input)
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ExportError::UnsupportedFormat { .. } | ExportError::CorruptFile { .. }
        )
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ExportError::UnsupportedFormat { .. } => {
                "Convert the file to WAV or MP3 before running the export"
            }
            ExportError::CorruptFile { .. } => {
                "Check if the file plays in another application, or re-export it from source"
            }
            ExportError::LoudnessToolFailure { .. } => {
                "Make sure ffmpeg is installed and on PATH, or pass --ffmpeg <path>"
            }
            ExportError::Encode { .. } => {
                "Check that the target format and bitrate are supported by your ffmpeg build"
            }
            ExportError::InvalidConfig { .. } => "Fix the flag value and run again",
            ExportError::Preset { .. } => "Check the preset file against the documented fields",
            _ => "Check the error details and try again",
        }
    }
}
