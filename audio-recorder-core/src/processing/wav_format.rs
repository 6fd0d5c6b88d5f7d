//! WAV container layout for 32-bit IEEE float audio.
//!
//! Non-PCM WAVE files carry an 18-byte `fmt ` chunk (with a zero `cbSize`)
//! and a `fact` chunk holding the frame count, so the header is 58 bytes
//! rather than the 44 of a plain PCM file.

use crate::models::error::CaptureError;

/// WAVE format tag for IEEE float samples.
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// Bits per stored sample.
pub const BITS_PER_SAMPLE: u16 = 32;

/// Size of the header written by [`generate_float_header`].
pub const FLOAT_HEADER_SIZE: usize = 58;

const FMT_CHUNK_SIZE: u32 = 18;
const FACT_CHUNK_SIZE: u32 = 4;

/// Generate the 58-byte header for a float WAV file.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 = 50 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  18 (fmt chunk size)
/// [20-21]  3 (IEEE float format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * 4
/// [32-33]  block_align = channels * 4
/// [34-35]  32 (bits per sample)
/// [36-37]  0 (cbSize)
/// [38-41]  "fact"
/// [42-45]  4
/// [46-49]  frame_count
/// [50-53]  "data"
/// [54-57]  data_size = frame_count * block_align
/// ```
pub fn generate_float_header(sample_rate: u32, channels: u16, frame_count: u32) -> [u8; FLOAT_HEADER_SIZE] {
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;
    let data_size = frame_count * block_align as u32;
    let riff_size = (FLOAT_HEADER_SIZE as u32 - 8) + data_size;

    let mut header = [0u8; FLOAT_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&WAVE_FORMAT_IEEE_FLOAT.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..38].copy_from_slice(&0u16.to_le_bytes());

    // fact sub-chunk
    header[38..42].copy_from_slice(b"fact");
    header[42..46].copy_from_slice(&FACT_CHUNK_SIZE.to_le_bytes());
    header[46..50].copy_from_slice(&frame_count.to_le_bytes());

    // data sub-chunk
    header[50..54].copy_from_slice(b"data");
    header[54..58].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Largest frame count whose data chunk still fits the 32-bit RIFF size field.
pub fn max_frames(channels: u16) -> u64 {
    let block_align = channels as u64 * (BITS_PER_SAMPLE / 8) as u64;
    if block_align == 0 {
        return 0;
    }
    (u32::MAX as u64 - (FLOAT_HEADER_SIZE as u64 - 8)) / block_align
}

/// Encode f32 samples as little-endian bytes.
pub fn encode_samples(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 4);
    for &sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// A float WAV file decoded back into samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWav {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_count: usize,
    pub samples: Vec<f32>,
}

/// Parse a float WAV image, skipping chunks other than `fmt ` and `data`.
pub fn parse_float_wav(bytes: &[u8]) -> Result<DecodedWav, CaptureError> {
    let malformed = |what: &str| CaptureError::SaveFailed(format!("malformed wav: {}", what));

    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(malformed("missing RIFF/WAVE magic"));
    }

    let mut format: Option<(u16, u16, u32, u16)> = None;
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = read_u32(bytes, offset + 4) as usize;
        let body_start = offset + 8;
        let body_end = body_start
            .checked_add(size)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| malformed("chunk runs past end of file"))?;
        let body = &bytes[body_start..body_end];

        match id {
            b"fmt " => {
                if body.len() < 16 {
                    return Err(malformed("fmt chunk too short"));
                }
                format = Some((
                    read_u16(body, 0),
                    read_u16(body, 2),
                    read_u32(body, 4),
                    read_u16(body, 14),
                ));
            }
            b"data" => {
                let (tag, channels, sample_rate, bits) = format.ok_or_else(|| malformed("data before fmt"))?;
                if tag != WAVE_FORMAT_IEEE_FLOAT || bits != BITS_PER_SAMPLE {
                    return Err(malformed("not 32-bit float audio"));
                }
                if channels == 0 {
                    return Err(malformed("zero channels"));
                }
                let samples: Vec<f32> = body
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                return Ok(DecodedWav {
                    sample_rate,
                    channels,
                    frame_count: samples.len() / channels as usize,
                    samples,
                });
            }
            _ => {}
        }

        // Chunks are word-aligned.
        offset = body_end + (size & 1);
    }

    Err(malformed("no data chunk"))
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_58_bytes() {
        let header = generate_float_header(44100, 1, 0);
        assert_eq!(header.len(), 58);
    }

    #[test]
    fn header_chunk_ids() {
        let header = generate_float_header(44100, 1, 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[38..42], b"fact");
        assert_eq!(&header[50..54], b"data");
    }

    #[test]
    fn header_float_format() {
        let header = generate_float_header(44100, 1, 0);
        assert_eq!(u16::from_le_bytes([header[20], header[21]]), 3);
        assert_eq!(u32::from_le_bytes([header[16], header[17], header[18], header[19]]), 18);
        assert_eq!(u16::from_le_bytes([header[34], header[35]]), 32);
        assert_eq!(u16::from_le_bytes([header[36], header[37]]), 0);
    }

    #[test]
    fn header_48khz_stereo() {
        let header = generate_float_header(48000, 2, 1200);

        assert_eq!(u16::from_le_bytes([header[22], header[23]]), 2);
        assert_eq!(u32::from_le_bytes([header[24], header[25], header[26], header[27]]), 48000);
        // 48000 * 2 * 4
        assert_eq!(u32::from_le_bytes([header[28], header[29], header[30], header[31]]), 384000);
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 8);
        assert_eq!(u32::from_le_bytes([header[46], header[47], header[48], header[49]]), 1200);

        let data_size = u32::from_le_bytes([header[54], header[55], header[56], header[57]]);
        assert_eq!(data_size, 9600);

        let riff_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        assert_eq!(riff_size, 50 + 9600);
    }

    #[test]
    fn parse_header_plus_data() {
        let samples = [0.25f32, -0.5, 1.0, 0.0];
        let mut bytes = generate_float_header(16000, 2, 2).to_vec();
        bytes.extend_from_slice(&encode_samples(&samples));

        let decoded = parse_float_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frame_count, 2);
        assert_eq!(decoded.samples, samples.to_vec());
    }

    #[test]
    fn parse_rejects_pcm() {
        let mut bytes = generate_float_header(16000, 1, 1).to_vec();
        bytes[20..22].copy_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&encode_samples(&[0.1]));
        assert!(parse_float_wav(&bytes).is_err());
    }

    #[test]
    fn parse_rejects_truncated_data() {
        let mut bytes = generate_float_header(16000, 1, 10).to_vec();
        bytes.extend_from_slice(&encode_samples(&[0.1, 0.2]));
        assert!(parse_float_wav(&bytes).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_float_wav(b"not a wav file at all").is_err());
    }

    #[test]
    fn max_frames_fits_riff_field() {
        let frames = max_frames(2);
        let data = frames * 8;
        assert!(data + 50 <= u32::MAX as u64);
        assert!((frames + 1) * 8 + 50 > u32::MAX as u64);
    }

    #[test]
    fn downmix_stereo_to_mono() {
        let stereo = [0.2, 0.8, 0.4, 0.6];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.5).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }
}
