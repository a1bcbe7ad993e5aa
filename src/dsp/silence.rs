//! Trailing silence trimming
//!
//! The track is split into chunks of program material separated by runs of
//! silence. The first chunk is always kept; later chunks are re-appended while
//! they are short (internal pauses, stingers), and the first long chunk marks
//! the point after which everything is dropped.

use crate::engine::AudioBuffer;

/// Windows at or below this RMS level count as silence
pub const SILENCE_THRESHOLD_DBFS: f32 = -50.0;

/// Minimum length of a silent run
pub const MIN_SILENCE_MS: f64 = 1000.0;

/// Silence kept on each side of a chunk
pub const KEEP_SILENCE_MS: f64 = 100.0;

/// Step between successive detection windows
const SEEK_STEP_MS: f64 = 1.0;

/// A contiguous run of program material, as a frame range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceChunk {
    pub start: usize,
    pub end: usize,
}

impl SilenceChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_ms(&self, sample_rate: u32) -> f64 {
        self.len() as f64 * 1000.0 / sample_rate as f64
    }
}

/// Remove the tail of a track once a non-silent chunk longer than
/// `silence_threshold_s` follows the opening chunk
///
/// A track that is silent throughout is returned unchanged.
pub fn trim_trailing_silence(buffer: AudioBuffer, silence_threshold_s: f64) -> AudioBuffer {
    let chunks = split_on_silence(&buffer);
    let Some((first, rest)) = chunks.split_first() else {
        return buffer;
    };

    let limit_ms = silence_threshold_s * 1000.0;
    let rate = buffer.sample_rate();

    let mut retained = vec![*first];
    for chunk in rest {
        if chunk.duration_ms(rate) <= limit_ms {
            retained.push(*chunk);
        } else {
            log::debug!(
                "dropping tail from frame {} ({:.0} ms chunk exceeds {:.0} ms)",
                chunk.start,
                chunk.duration_ms(rate),
                limit_ms
            );
            break;
        }
    }

    let total: usize = retained.iter().map(SilenceChunk::len).sum();
    let channels = buffer
        .channels()
        .map(|samples| {
            let mut out = Vec::with_capacity(total);
            for chunk in &retained {
                out.extend_from_slice(&samples[chunk.start..chunk.end]);
            }
            out
        })
        .collect();

    AudioBuffer::with_format(channels, rate, buffer.sample_width())
}

/// Split a buffer on silence into padded program chunks
///
/// Each chunk keeps up to [`KEEP_SILENCE_MS`] of the surrounding silence;
/// where the padding of two neighbours would overlap, the gap is split at its
/// midpoint.
pub fn split_on_silence(buffer: &AudioBuffer) -> Vec<SilenceChunk> {
    let len = buffer.num_frames();
    let keep = buffer.frames_for_ms(KEEP_SILENCE_MS) as i64;

    let mut ranges: Vec<(i64, i64)> = detect_nonsilent(buffer)
        .into_iter()
        .map(|(start, end)| (start as i64 - keep, end as i64 + keep))
        .collect();

    for i in 1..ranges.len() {
        let last_end = ranges[i - 1].1;
        let next_start = ranges[i].0;
        if next_start < last_end {
            let mid = (last_end + next_start).div_euclid(2);
            ranges[i - 1].1 = mid;
            ranges[i].0 = mid;
        }
    }

    ranges
        .into_iter()
        .map(|(start, end)| SilenceChunk {
            start: start.clamp(0, len as i64) as usize,
            end: end.clamp(0, len as i64) as usize,
        })
        .collect()
}

/// Frame ranges of program material between silent runs
pub fn detect_nonsilent(buffer: &AudioBuffer) -> Vec<(usize, usize)> {
    let len = buffer.num_frames();
    let silent = detect_silence(buffer);

    if silent.is_empty() {
        return vec![(0, len)];
    }
    if silent[0] == (0, len) {
        return Vec::new();
    }

    let mut nonsilent = Vec::with_capacity(silent.len() + 1);
    let mut prev_end = 0;
    for &(start, end) in &silent {
        nonsilent.push((prev_end, start));
        prev_end = end;
    }
    if prev_end != len {
        nonsilent.push((prev_end, len));
    }
    if nonsilent.first() == Some(&(0, 0)) {
        nonsilent.remove(0);
    }
    nonsilent
}

/// Frame ranges where the RMS level stays at or below the silence floor for
/// at least [`MIN_SILENCE_MS`]
pub fn detect_silence(buffer: &AudioBuffer) -> Vec<(usize, usize)> {
    let len = buffer.num_frames();
    let min_len = buffer.frames_for_ms(MIN_SILENCE_MS).max(1);
    if len < min_len {
        return Vec::new();
    }

    let step = buffer.frames_for_ms(SEEK_STEP_MS).max(1);
    let floor = 10.0_f64.powf(SILENCE_THRESHOLD_DBFS as f64 / 20.0);
    let floor_energy = floor * floor * (min_len * buffer.num_channels()) as f64;

    let frame_energy = |frame: usize| -> f64 {
        buffer
            .channels()
            .map(|channel| {
                let s = channel[frame] as f64;
                s * s
            })
            .sum()
    };
    let window_energy = |start: usize| -> f64 { (start..start + min_len).map(frame_energy).sum() };

    // Sliding sum: each step drops the frames leaving the window and adds
    // the frames entering it
    let last_start = len - min_len;
    let mut silence_starts = Vec::new();
    let mut start = 0;
    let mut energy = window_energy(0);
    loop {
        if energy <= floor_energy {
            silence_starts.push(start);
        }
        let next = start + step;
        if next > last_start {
            break;
        }
        for frame in start..next {
            energy -= frame_energy(frame);
        }
        for frame in start + min_len..next + min_len {
            energy += frame_energy(frame);
        }
        start = next;
    }
    // The final window is checked even when the step does not land on it
    if last_start % step != 0 && window_energy(last_start) <= floor_energy {
        silence_starts.push(last_start);
    }

    let Some((&first, rest)) = silence_starts.split_first() else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let mut range_start = first;
    let mut prev = first;
    for &start in rest {
        let continuous = start == prev + step;
        let has_gap = start > prev + min_len;
        if !continuous && has_gap {
            ranges.push((range_start, prev + min_len));
            range_start = start;
        }
        prev = start;
    }
    ranges.push((range_start, prev + min_len));
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SampleWidth;

    const RATE: u32 = 1000;

    /// Build a mono buffer from (seconds, amplitude) segments of a square-ish
    /// signal; amplitude 0 is digital silence
    fn segments(parts: &[(f64, f32)]) -> AudioBuffer {
        let mut samples = Vec::new();
        for &(secs, amp) in parts {
            let frames = (secs * RATE as f64) as usize;
            samples.extend((0..frames).map(|i| if i % 2 == 0 { amp } else { -amp }));
        }
        AudioBuffer::from_channels(vec![samples], RATE, SampleWidth::Bits16).unwrap()
    }

    #[test]
    fn test_detect_silence_finds_gap() {
        let buffer = segments(&[(2.0, 0.5), (1.5, 0.0), (2.0, 0.5)]);
        let silent = detect_silence(&buffer);
        assert_eq!(silent, vec![(2000, 3500)]);
    }

    #[test]
    fn test_short_gap_is_not_silence() {
        let buffer = segments(&[(2.0, 0.5), (0.5, 0.0), (2.0, 0.5)]);
        assert!(detect_silence(&buffer).is_empty());
        assert_eq!(split_on_silence(&buffer).len(), 1);
    }

    #[test]
    fn test_split_pads_chunks() {
        let buffer = segments(&[(2.0, 0.5), (1.5, 0.0), (2.0, 0.5)]);
        let chunks = split_on_silence(&buffer);
        assert_eq!(
            chunks,
            vec![
                SilenceChunk { start: 0, end: 2100 },
                SilenceChunk { start: 3400, end: 5500 },
            ]
        );
    }

    #[test]
    fn test_long_second_chunk_is_dropped() {
        let buffer = segments(&[(3.0, 0.5), (2.0, 0.0), (4.0, 0.5)]);
        let trimmed = trim_trailing_silence(buffer, 1.0);
        // First chunk plus its trailing padding only
        assert_eq!(trimmed.num_frames(), 3100);
    }

    #[test]
    fn test_short_second_chunk_is_kept() {
        let buffer = segments(&[(3.0, 0.5), (2.0, 0.0), (0.5, 0.5), (2.0, 0.0)]);
        let trimmed = trim_trailing_silence(buffer, 1.0);
        // 3.0 s + 100 ms padding, then 100 + 500 + 100 ms
        assert_eq!(trimmed.num_frames(), 3100 + 700);
    }

    #[test]
    fn test_stops_at_first_long_chunk() {
        let buffer = segments(&[
            (3.0, 0.5),
            (1.5, 0.0),
            (4.0, 0.5),
            (1.5, 0.0),
            (0.2, 0.5),
        ]);
        let trimmed = trim_trailing_silence(buffer, 1.0);
        assert_eq!(trimmed.num_frames(), 3100);
    }

    #[test]
    fn test_all_silent_returns_original() {
        let buffer = segments(&[(3.0, 0.0)]);
        let trimmed = trim_trailing_silence(buffer.clone(), 1.0);
        assert_eq!(trimmed, buffer);
    }

    #[test]
    fn test_leading_silence_is_not_a_chunk() {
        let buffer = segments(&[(1.5, 0.0), (2.0, 0.5)]);
        let chunks = split_on_silence(&buffer);
        assert_eq!(chunks, vec![SilenceChunk { start: 1400, end: 3500 }]);
    }

    #[test]
    fn test_unaligned_final_window_is_checked() {
        // 48 frames per step at 48 kHz; 2.5 s of tone then 1.0205 s of silence
        // leaves the last window start off the step grid
        let rate = 48000;
        let mut samples: Vec<f32> = (0..120_000)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        samples.extend(std::iter::repeat(0.0).take(48_984));
        let buffer = AudioBuffer::from_channels(vec![samples], rate, SampleWidth::Bits16).unwrap();
        assert_eq!(detect_silence(&buffer), vec![(120_000, 168_984)]);
    }

    #[test]
    fn test_quiet_noise_counts_as_silence() {
        // -60 dBFS is below the -50 dBFS floor
        let buffer = segments(&[(2.0, 0.5), (1.5, 0.001), (2.0, 0.5)]);
        assert_eq!(detect_silence(&buffer).len(), 1);
    }
}
