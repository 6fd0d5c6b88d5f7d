use serde::{Deserialize, Serialize};

/// Captured audio: interleaved f32 samples plus the format they were captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of complete frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Transport type for an audio input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioTransportType {
    BuiltIn,
    Bluetooth,
    Usb,
    Virtual,
    Unknown,
}

/// An input device a block source captures from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub transport_type: Option<AudioTransportType>,
}

/// Microphone permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Loudness of the most recent block.
///
/// `rms` and `peak` are raw sample magnitudes; `display` is the RMS scaled
/// into 0.0–1.0 for meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
    pub display: f32,
}

/// Counters for debugging a recording session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    pub blocks_processed: u64,
    pub samples_captured: u64,
    /// Frames in the current quiet run (until-silence mode).
    pub quiet_frames: u64,
    pub late_blocks_ignored: u64,
    pub downmixed_blocks: u64,
    /// Blocks whose length differed from the nominal `block_duration`.
    pub irregular_blocks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_and_duration() {
        let buffer = AudioBuffer {
            samples: vec![0.0; 48000],
            sample_rate: 24000,
            channels: 2,
        };
        assert_eq!(buffer.frame_count(), 24000);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_frame_is_not_counted() {
        let buffer = AudioBuffer {
            samples: vec![0.0; 5],
            sample_rate: 8000,
            channels: 2,
        };
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn empty_buffer() {
        let buffer = AudioBuffer::new(44100, 1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_secs(), 0.0);
    }
}
