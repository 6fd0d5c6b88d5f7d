use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::recording_result::SavedRecording;
use crate::processing::wav_format::{self, DecodedWav};

/// Write interleaved f32 samples as a 32-bit float WAV file.
///
/// The file is first written to a hidden sibling and renamed over
/// `destination`, so readers never observe a half-written recording. When the
/// rename is refused the data is written to `destination` directly, and a
/// failed direct write removes what it left behind.
///
/// A trailing partial frame (sample count not divisible by `channels`) is
/// dropped rather than written.
pub fn write_wav(
    samples: &[f32],
    destination: &Path,
    sample_rate: u32,
    channels: u16,
) -> Result<SavedRecording, CaptureError> {
    if samples.is_empty() {
        return Err(CaptureError::SaveFailed("no audio data".into()));
    }
    if channels == 0 || channels > u16::MAX / 4 {
        return Err(CaptureError::SaveFailed(format!("unsupported channel count: {}", channels)));
    }
    if sample_rate == 0 || sample_rate.checked_mul(channels as u32 * 4).is_none() {
        return Err(CaptureError::SaveFailed(format!("unsupported sample rate: {}", sample_rate)));
    }

    let channel_count = channels as usize;
    let frame_count = samples.len() / channel_count;
    let dropped = samples.len() % channel_count;
    if dropped > 0 {
        log::warn!(
            "dropping {} trailing sample(s) that do not form a complete {}-channel frame",
            dropped,
            channels
        );
    }
    if frame_count == 0 {
        return Err(CaptureError::SaveFailed("no complete audio frame".into()));
    }
    if frame_count as u64 > wav_format::max_frames(channels) {
        return Err(CaptureError::SaveFailed(format!(
            "{} frames exceed the WAV size limit",
            frame_count
        )));
    }

    let header = wav_format::generate_float_header(sample_rate, channels, frame_count as u32);
    let mut contents = Vec::with_capacity(header.len() + frame_count * channel_count * 4);
    contents.extend_from_slice(&header);
    contents.extend_from_slice(&wav_format::encode_samples(&samples[..frame_count * channel_count]));

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CaptureError::SaveFailed(format!("failed to create directory: {}", e)))?;
    }

    persist(destination, &contents)?;

    let checksum = sha256_file(destination)?;
    log::info!(
        "saved {} frames ({} ch @ {} Hz) to {}",
        frame_count,
        channels,
        sample_rate,
        destination.display()
    );

    Ok(SavedRecording {
        file_path: destination.to_path_buf(),
        frame_count,
        sample_rate,
        channels,
        duration_secs: frame_count as f64 / sample_rate as f64,
        checksum,
        created_at: chrono::Utc::now(),
    })
}

/// Read a float WAV file written by [`write_wav`].
pub fn read_wav(path: &Path) -> Result<DecodedWav, CaptureError> {
    let bytes = fs::read(path)
        .map_err(|e| CaptureError::SaveFailed(format!("failed to read {}: {}", path.display(), e)))?;
    wav_format::parse_float_wav(&bytes)
}

/// Compute SHA-256 hex digest of a file.
///
/// Used for the checksum in [`SavedRecording`], so it reflects what reached disk.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data = fs::read(path)
        .map_err(|e| CaptureError::SaveFailed(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&Sha256::digest(&data)))
}

fn persist(destination: &Path, contents: &[u8]) -> Result<(), CaptureError> {
    let temp_path = temp_sibling(destination);

    if let Err(e) = write_synced(&temp_path, contents) {
        fs::remove_file(&temp_path).ok();
        return Err(CaptureError::SaveFailed(format!("write failed: {}", e)));
    }

    match fs::rename(&temp_path, destination) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::warn!(
                "atomic rename to {} failed ({}), writing directly",
                destination.display(),
                e
            );
            fs::remove_file(&temp_path).ok();
            write_synced(destination, contents).map_err(|e| {
                fs::remove_file(destination).ok();
                CaptureError::SaveFailed(format!("write failed: {}", e))
            })
        }
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn temp_sibling(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".into());
    destination.with_file_name(format!(".{}.{}.partial", name, uuid::Uuid::new_v4()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
