//! Audio decoding
//!
//! Uses symphonia for decoding input files (WAV, MP3, OGG Vorbis, FLAC, AAC)
//! into an [`AudioBuffer`] at their native sample rate.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::{AudioBuffer, SampleWidth};
use crate::error::{ExportError, Result};

/// Source of decoded audio for the pipeline
pub trait Decoder: Send + Sync {
    /// Decode a whole file into memory
    ///
    /// Fails with `UnsupportedFormat` or `CorruptFile`.
    fn decode(&self, path: &Path) -> Result<AudioBuffer>;
}

/// Universal audio decoder using symphonia
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        let file = File::open(path).map_err(|e| ExportError::CorruptFile {
            path: path.to_path_buf(),
            details: format!("Failed to open file: {}", e),
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_error(path, "probe", e))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
                details: "No audio track found".to_string(),
            })?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| decode_error(path, "codec", e))?;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|c| c.count());
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(decode_error(path, "packet", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(spec.channels.count());

                    let buf = sample_buf.get_or_insert_with(|| {
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                    });
                    if buf.capacity() < decoded.capacity() * spec.channels.count() {
                        *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    }
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
                // A damaged frame in a lossy stream is skipped, not fatal
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::debug!("{}: skipping undecodable packet: {}", path.display(), msg);
                }
                Err(e) => return Err(decode_error(path, "decode", e)),
            }
        }

        let channels = channels.unwrap_or(0);
        let sample_rate = sample_rate.unwrap_or(0);
        if channels == 0 || sample_rate == 0 || interleaved.is_empty() {
            return Err(ExportError::CorruptFile {
                path: path.to_path_buf(),
                details: "No audio frames could be decoded".to_string(),
            });
        }

        // Lossy codecs decode to float; report them at 16 bits like a PCM render
        let width = codec_params
            .bits_per_sample
            .map(SampleWidth::at_least)
            .unwrap_or(SampleWidth::Bits16);

        AudioBuffer::from_interleaved(&interleaved, channels, sample_rate, width).map_err(|e| {
            ExportError::CorruptFile {
                path: path.to_path_buf(),
                details: e.to_string(),
            }
        })
    }
}

/// Map a symphonia error onto the decode error class
fn decode_error(path: &Path, stage: &str, err: SymphoniaError) -> ExportError {
    match err {
        SymphoniaError::Unsupported(what) => ExportError::UnsupportedFormat {
            path: path.to_path_buf(),
            details: format!("{}: {}", stage, what),
        },
        other => ExportError::CorruptFile {
            path: path.to_path_buf(),
            details: format!("{}: {}", stage, other),
        },
    }
}
