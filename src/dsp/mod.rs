//! DSP Effects Library
//!
//! In-memory transforms applied between decode and the loudness/export stages.
//! Length-preserving effects implement [`Effect`]; the trimming stages are free
//! functions because they change the frame count.

mod compressor;
mod effect;
mod fade;
mod normalize;
mod silence;
mod trim;

pub use compressor::{compress_dynamic_range, Compressor, CompressorParams};
pub use effect::Effect;
pub use fade::{apply_fade, Fader};
pub use normalize::{normalize_peak, PeakNormalizer, DEFAULT_HEADROOM_DB};
pub use silence::{
    detect_nonsilent, detect_silence, split_on_silence, trim_trailing_silence, SilenceChunk,
    KEEP_SILENCE_MS, MIN_SILENCE_MS, SILENCE_THRESHOLD_DBFS,
};
pub use trim::{trim_range, ClampWarning, TrimOutcome};
