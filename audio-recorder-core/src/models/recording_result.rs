use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result returned when a recording has been written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecording {
    pub file_path: PathBuf,
    pub frame_count: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
    /// SHA-256 hex digest of the file contents.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}
