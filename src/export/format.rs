//! Output format and bitrate

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// Logical output format selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Ogg,
    M4a,
    Mp3,
    Wav,
}

impl ExportFormat {
    /// Container name handed to the encoder (`m4a` is written as `mp4`)
    pub fn container(&self) -> &'static str {
        match self {
            ExportFormat::Ogg => "ogg",
            ExportFormat::M4a => "mp4",
            ExportFormat::Mp3 => "mp3",
            ExportFormat::Wav => "wav",
        }
    }

    /// File extension of exported files, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Ogg => "ogg",
            ExportFormat::M4a => "m4a",
            ExportFormat::Mp3 => "mp3",
            ExportFormat::Wav => "wav",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ogg" => Ok(ExportFormat::Ogg),
            "m4a" => Ok(ExportFormat::M4a),
            "mp3" => Ok(ExportFormat::Mp3),
            "wav" => Ok(ExportFormat::Wav),
            other => Err(ExportError::invalid_config(
                "format",
                other,
                "one of ogg, m4a, mp3, wav",
            )),
        }
    }
}

/// Canonical bitrate string, always carrying a `k` suffix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bitrate(String);

impl Bitrate {
    /// Parse `"128"`, `"128k"` or `"128K"` into `"128k"`
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_suffix(['k', 'K'])
            .unwrap_or(trimmed);

        let valid = !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && digits.chars().any(|c| c != '0');
        if !valid {
            return Err(ExportError::invalid_config(
                "bitrate",
                raw,
                "a positive number of kbit/s, optionally suffixed with k (e.g. 128k)",
            ));
        }
        Ok(Bitrate(format!("{}k", digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Bitrate {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        Bitrate::parse(s)
    }
}

impl TryFrom<String> for Bitrate {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self> {
        Bitrate::parse(&value)
    }
}

impl From<Bitrate> for String {
    fn from(bitrate: Bitrate) -> Self {
        bitrate.0
    }
}
