//! audio-export - Batch audio effect chain and export pipeline
//!
//! Each input file is decoded into memory, run through an optional chain of
//! effects in a fixed order, converted to the target rate and depth, and
//! encoded into the output tree.
//!
//! # Architecture
//!
//! - `engine`: audio buffer, decoding, WAV I/O, rate/depth conversion
//! - `dsp`: in-memory effects (silence and range trimming, fades, peak
//!   normalization, compression)
//! - `loudness`: two-pass loudness normalization through an external filter
//! - `export`: format mapping and encoders
//! - `pipeline`: configuration, stage plan, per-file orchestration, batches

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod export;
pub mod loudness;
pub mod pipeline;
pub mod tool;

pub use engine::{AudioBuffer, SampleWidth};
pub use error::{ExportError, Result};
pub use pipeline::{BatchReport, BatchRunner, EffectRequest, Pipeline, RunConfig};
