//! CLI Module
//!
//! Command-line interface for the batch exporter.

pub mod commands;

use clap::Parser;
use std::path::PathBuf;

use crate::export::ExportFormat;

/// Convert and process audio files with various effects
#[derive(Parser, Debug)]
#[command(name = "audio-export")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Folder containing the audio files to be processed
    #[arg(short, long = "input-folder", alias = "input_folder")]
    pub input_folder: PathBuf,

    /// Output folder for the processed audio files
    #[arg(short, long = "output-folder", alias = "output_folder")]
    pub output_folder: PathBuf,

    /// Target audio format for the output
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Bitrate for the output audio (e.g. 96k)
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// Sample rate (kHz) for the output audio
    #[arg(short, long = "sample-rate", alias = "sample_rate")]
    pub sample_rate: Option<f64>,

    /// Bit depth for the output audio (8, 16, 24 or 32)
    #[arg(short = 'd', long = "bit-depth", alias = "bit_depth")]
    pub bit_depth: Option<u16>,

    /// Remove content at the end of the track after a chunk longer than this (seconds)
    #[arg(long = "end-silence", alias = "end_silence")]
    pub end_silence: Option<f64>,

    /// Apply fade in and fade out of this duration (seconds)
    #[arg(long)]
    pub fade: Option<f64>,

    /// Offset and length for trimming the track (seconds)
    #[arg(short, long, num_args = 2, value_names = ["OFFSET", "LENGTH"])]
    pub trim: Option<Vec<u32>>,

    /// Normalize the audio to peak amplitude
    #[arg(short, long)]
    pub normalize: bool,

    /// Compress the dynamic range of the audio
    #[arg(short, long)]
    pub compress: bool,

    /// Target LUFS for loudness normalization
    #[arg(short, long, allow_negative_numbers = true)]
    pub lufs: Option<f64>,

    /// Number of files processed in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Feed the low-pass output into the loudness pass
    #[arg(long = "chain-lowpass")]
    pub chain_lowpass: bool,

    /// Kill external tool runs after this many seconds
    #[arg(long = "tool-timeout")]
    pub tool_timeout: Option<f64>,

    /// JSON preset with default settings; flags override it
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Write a JSON batch report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
