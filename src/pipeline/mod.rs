//! Export pipeline
//!
//! - `config`: run configuration and presets
//! - `stage`: the fixed-order stage plan
//! - `orchestrator`: per-file processing and reports
//! - `batch`: directory walking and the worker pool

pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod stage;

pub use batch::{BatchReport, BatchRunner};
pub use config::{EffectRequest, Preset, RunConfig, TrimWindow, DEFAULT_EXTENSIONS};
pub use orchestrator::{FileReport, Outcome, Pipeline, StageTiming};
pub use stage::{plan, Operation, PlannedStage, StageKind, Step};

pub use crate::export::ExportSpec;
