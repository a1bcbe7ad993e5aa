//! Audio Engine Module
//!
//! Core audio plumbing shared by every stage:
//! - In-memory audio buffer
//! - Decoding of input files
//! - WAV file I/O
//! - Sample rate / bit depth conversion

pub mod buffer;
pub mod convert;
pub mod decoder;
pub mod io;

pub use buffer::{AudioBuffer, SampleWidth};
pub use convert::{convert, khz_to_hz, requantize, resample};
pub use decoder::{Decoder, SymphoniaDecoder};
pub use io::{generate_test_tone, read_wav, write_wav};
