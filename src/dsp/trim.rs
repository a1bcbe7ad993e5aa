//! Fixed-window trimming
//!
//! Cuts `length_s` seconds starting at `offset_s`. A window running past the
//! end of the track is clamped and reported through [`ClampWarning`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::AudioBuffer;

/// Non-fatal notice that a trim window was cut short by the end of the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClampWarning {
    pub offset_s: u32,
    pub requested_length_s: u32,
    pub available_length_s: f64,
}

impl fmt::Display for ClampWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The final music length after {} seconds offset is shorter than {} seconds ({:.2}s available)",
            self.offset_s, self.requested_length_s, self.available_length_s
        )
    }
}

/// Result of a range trim
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub buffer: AudioBuffer,
    pub warning: Option<ClampWarning>,
}

/// Extract `[offset_s, offset_s + length_s)` from the buffer
pub fn trim_range(buffer: AudioBuffer, offset_s: u32, length_s: u32) -> TrimOutcome {
    let rate = buffer.sample_rate() as u64;
    let total = buffer.num_frames() as u64;

    let start = offset_s as u64 * rate;
    let requested_end = (offset_s as u64 + length_s as u64) * rate;

    let warning = if requested_end > total {
        let available = total.saturating_sub(start) as f64 / rate.max(1) as f64;
        Some(ClampWarning {
            offset_s,
            requested_length_s: length_s,
            available_length_s: available,
        })
    } else {
        None
    };

    let end = requested_end.min(total);
    let trimmed = buffer.slice_frames(start.min(end) as usize, end as usize);

    TrimOutcome {
        buffer: trimmed,
        warning,
    }
}
