//! WAV framing metadata and duration math.
//!
//! The audio output device offers no completion callback, so playback
//! completion is simulated by sleeping for the clip's duration. That makes
//! duration estimation a first-class function: it reads the WAV framing
//! metadata (sample count over byte rate) and only falls back to a
//! byte-length heuristic when the header is unreadable.
//!
//! Pure functions — no I/O, no async runtime.

/// Fallback bytes-per-second when a clip carries no readable framing
/// metadata. Matches 16 kHz mono 16-bit PCM.
pub const FALLBACK_BYTES_PER_SEC: u32 = 32_000;

/// Parsed WAV header fields needed for duration math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Byte offset in the buffer where raw PCM data begins.
    pub data_offset: usize,
    /// Declared data-chunk size, when the header carries a real one.
    /// `None` for streaming backends that write the 0xFFFFFFFF sentinel.
    pub data_len: Option<u32>,
}

/// Parse a WAV header from a byte buffer.
///
/// Handles streaming-backend `0xFFFFFFFF` sentinel sizes by reporting the
/// data length as unknown; callers then measure from the buffer tail.
pub fn parse_wav_header(buf: &[u8]) -> Result<WavHeader, &'static str> {
    if buf.len() < 12 {
        return Err("too short for RIFF header");
    }
    if &buf[0..4] != b"RIFF" {
        return Err("missing RIFF tag");
    }
    if &buf[8..12] != b"WAVE" {
        return Err("missing WAVE tag");
    }

    let mut pos = 12;
    let mut channels: Option<u16> = None;
    let mut sample_rate: Option<u32> = None;
    let mut bits_per_sample: Option<u16> = None;

    while pos + 8 <= buf.len() {
        let chunk_id = &buf[pos..pos + 4];
        let chunk_size =
            u32::from_le_bytes([buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]]);

        if chunk_id == b"fmt " {
            if pos + 24 > buf.len() {
                return Err("fmt chunk truncated");
            }
            let audio_format = u16::from_le_bytes([buf[pos + 8], buf[pos + 9]]);
            if audio_format != 1 {
                return Err("not PCM format");
            }
            channels = Some(u16::from_le_bytes([buf[pos + 10], buf[pos + 11]]));
            sample_rate = Some(u32::from_le_bytes([
                buf[pos + 12],
                buf[pos + 13],
                buf[pos + 14],
                buf[pos + 15],
            ]));
            bits_per_sample = Some(u16::from_le_bytes([buf[pos + 22], buf[pos + 23]]));

            let skip = if chunk_size == 0xFFFFFFFF {
                16 // standard fmt chunk payload
            } else {
                chunk_size as usize
            };
            pos += 8 + skip;
            continue;
        }

        if chunk_id == b"data" {
            let ch = channels.ok_or("data chunk before fmt chunk")?;
            let sr = sample_rate.ok_or("data chunk before fmt chunk")?;
            let bps = bits_per_sample.ok_or("data chunk before fmt chunk")?;
            let data_len = if chunk_size == 0xFFFFFFFF {
                None
            } else {
                Some(chunk_size)
            };
            return Ok(WavHeader {
                channels: ch,
                sample_rate: sr,
                bits_per_sample: bps,
                data_offset: pos + 8,
                data_len,
            });
        }

        // Skip unknown chunks
        let skip = if chunk_size == 0xFFFFFFFF {
            0
        } else {
            chunk_size as usize
        };
        pos += 8 + skip;
    }

    Err("data chunk not found")
}

/// Clip duration in seconds from framing metadata.
///
/// `None` when the buffer does not parse as PCM WAV; use
/// [`estimate_duration`] when a best-effort answer is needed.
pub fn clip_duration(buf: &[u8]) -> Option<f32> {
    let hdr = parse_wav_header(buf).ok()?;
    let byte_rate =
        hdr.sample_rate as u64 * hdr.channels as u64 * (hdr.bits_per_sample as u64 / 8);
    if byte_rate == 0 {
        return None;
    }
    let data_bytes = match hdr.data_len {
        Some(len) => (len as usize).min(buf.len().saturating_sub(hdr.data_offset)),
        None => buf.len().saturating_sub(hdr.data_offset),
    };
    Some(data_bytes as f32 / byte_rate as f32)
}

/// Best-effort clip duration: framing metadata when readable, byte-length
/// heuristic otherwise.
pub fn estimate_duration(buf: &[u8]) -> f32 {
    clip_duration(buf).unwrap_or(buf.len() as f32 / FALLBACK_BYTES_PER_SEC as f32)
}

/// Fix WAV buffers with indeterminate sizes (0xFFFFFFFF).
///
/// Streaming backends emit chunked WAV with `0xFFFFFFFF` for the RIFF and
/// `data` chunk sizes. Once the full response is buffered the real sizes are
/// known, so patch them before the buffer is cached.
pub fn fix_wav_sizes(mut wav: Vec<u8>) -> Vec<u8> {
    if wav.len() < 44 {
        return wav;
    }
    if &wav[0..4] != b"RIFF" {
        return wav;
    }
    // Patch RIFF chunk size: total_len - 8
    let riff_size = (wav.len() - 8) as u32;
    wav[4..8].copy_from_slice(&riff_size.to_le_bytes());

    // Find the "data" sub-chunk and patch its size
    let mut pos = 12; // skip "RIFF" + size + "WAVE"
    while pos + 8 <= wav.len() {
        let chunk_id = &wav[pos..pos + 4];
        if chunk_id == b"data" {
            let data_size = (wav.len() - pos - 8) as u32;
            wav[pos + 4..pos + 8].copy_from_slice(&data_size.to_le_bytes());
            break;
        }
        let chunk_size =
            u32::from_le_bytes([wav[pos + 4], wav[pos + 5], wav[pos + 6], wav[pos + 7]]);
        let skip = if chunk_size == 0xFFFFFFFF {
            0
        } else {
            chunk_size as usize
        };
        pos += 8 + skip;
    }

    wav
}

/// Write a minimal WAV buffer (16-bit mono PCM) from raw samples.
///
/// Used by tests and fixtures to build clips of known duration.
pub fn write_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let file_len = 36 + data_len;
    let mut buf = Vec::with_capacity(44 + data_len as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_len.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
