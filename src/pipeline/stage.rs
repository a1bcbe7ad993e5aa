//! Stage plan
//!
//! The optional effect stages always run in one fixed order. The plan lists
//! every stage in that order and marks each one skipped or applied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::config::{EffectRequest, TrimWindow};

/// Optional stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    SilenceTrim,
    RangeTrim,
    Fade,
    Normalize,
    Compress,
    Loudness,
}

impl StageKind {
    pub const ORDER: [StageKind; 6] = [
        StageKind::SilenceTrim,
        StageKind::RangeTrim,
        StageKind::Fade,
        StageKind::Normalize,
        StageKind::Compress,
        StageKind::Loudness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::SilenceTrim => "silence_trim",
            StageKind::RangeTrim => "range_trim",
            StageKind::Fade => "fade",
            StageKind::Normalize => "normalize",
            StageKind::Compress => "compress",
            StageKind::Loudness => "loudness",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concrete work for an applied stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    SilenceTrim { threshold_s: f64 },
    RangeTrim(TrimWindow),
    Fade { duration_s: f64 },
    Normalize,
    Compress,
    Loudness { target_lufs: f64 },
}

impl Operation {
    pub fn kind(&self) -> StageKind {
        match self {
            Operation::SilenceTrim { .. } => StageKind::SilenceTrim,
            Operation::RangeTrim(_) => StageKind::RangeTrim,
            Operation::Fade { .. } => StageKind::Fade,
            Operation::Normalize => StageKind::Normalize,
            Operation::Compress => StageKind::Compress,
            Operation::Loudness { .. } => StageKind::Loudness,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::SilenceTrim { threshold_s } => {
                write!(f, "Cropping end silence to {}s", threshold_s)
            }
            Operation::RangeTrim(window) => write!(
                f,
                "Trimming to offset {}s, length {}s",
                window.offset_s, window.length_s
            ),
            Operation::Fade { duration_s } => write!(f, "Applying fade: {}s", duration_s),
            Operation::Normalize => f.write_str("Normalizing peak level"),
            Operation::Compress => f.write_str("Compressing dynamic range"),
            Operation::Loudness { target_lufs } => {
                write!(f, "Normalizing loudness to {} LUFS", target_lufs)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Skip,
    Apply(Operation),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedStage {
    pub kind: StageKind,
    pub step: Step,
}

impl PlannedStage {
    pub fn operation(&self) -> Option<&Operation> {
        match &self.step {
            Step::Apply(op) => Some(op),
            Step::Skip => None,
        }
    }
}

/// Build the ordered stage list for `effects`
///
/// A zero fade or a zero end-silence threshold is planned as a skip, the same
/// as an absent value.
pub fn plan(effects: &EffectRequest) -> Vec<PlannedStage> {
    StageKind::ORDER
        .iter()
        .map(|&kind| {
            let op = match kind {
                StageKind::SilenceTrim => effects
                    .end_silence_threshold_s
                    .filter(|t| *t > 0.0)
                    .map(|threshold_s| Operation::SilenceTrim { threshold_s }),
                StageKind::RangeTrim => effects.trim.map(Operation::RangeTrim),
                StageKind::Fade => effects
                    .fade_duration_s
                    .filter(|d| *d > 0.0)
                    .map(|duration_s| Operation::Fade { duration_s }),
                StageKind::Normalize => effects.normalize.then_some(Operation::Normalize),
                StageKind::Compress => effects.compress.then_some(Operation::Compress),
                StageKind::Loudness => effects
                    .target_lufs
                    .map(|target_lufs| Operation::Loudness { target_lufs }),
            };
            PlannedStage {
                kind,
                step: op.map_or(Step::Skip, Step::Apply),
            }
        })
        .collect()
}
