use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Configuration for a recording session.
///
/// All durations are in seconds. Missing fields take the defaults below when
/// deserialized, so a partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfiguration {
    /// Capture sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Number of interleaved channels (default: 1 for mono).
    pub channels: u16,

    /// RMS floor below which a block counts as quiet (default: 0.01).
    pub silence_threshold: f32,

    /// Seconds of sustained quiet that end an until-silence recording (default: 2.0).
    pub silence_duration: f64,

    /// Hard ceiling on an until-silence recording (default: 300.0).
    pub timeout: f64,

    /// Grace period during which silence is never evaluated (default: 1.0).
    pub min_duration: f64,

    /// Nominal block length a source is expected to deliver (default: 0.1).
    pub block_duration: f64,
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            silence_threshold: 0.01,
            silence_duration: 2.0,
            timeout: 300.0,
            min_duration: 1.0,
            block_duration: 0.1,
        }
    }
}

impl RecorderConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 {
            return Err("channel count must be at least 1".into());
        }
        if !self.silence_threshold.is_finite() || self.silence_threshold < 0.0 {
            return Err(format!("invalid silence threshold: {}", self.silence_threshold));
        }
        for (name, value) in [
            ("silence duration", self.silence_duration),
            ("timeout", self.timeout),
            ("minimum duration", self.min_duration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("invalid {}: {}", name, value));
            }
        }
        if !self.block_duration.is_finite() || self.block_duration <= 0.0 {
            return Err(format!("invalid block duration: {}", self.block_duration));
        }
        if self.min_duration > self.timeout {
            return Err(format!(
                "minimum duration {}s exceeds timeout {}s",
                self.min_duration, self.timeout
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::InvalidConfiguration(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(CaptureError::InvalidConfiguration)?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path)
            .map_err(|e| CaptureError::InvalidConfiguration(format!("failed to read config: {}", e)))?;
        Self::from_json_str(&json)
    }

    /// Number of nominal blocks covering `seconds`.
    pub fn blocks_for(&self, seconds: f64) -> u64 {
        (seconds / self.block_duration).round() as u64
    }

    /// Number of frames covering `seconds` at the configured rate.
    pub fn frames_for(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate as f64).round() as u64
    }

    /// Number of samples (all channels) in one nominal block.
    pub fn samples_per_block(&self) -> usize {
        (self.sample_rate as f64 * self.block_duration).round() as usize * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RecorderConfiguration::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 1);
        assert!((config.silence_threshold - 0.01).abs() < 1e-6);
        assert_eq!(config.silence_duration, 2.0);
        assert_eq!(config.timeout, 300.0);
        assert_eq!(config.min_duration, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_rate_and_channels() {
        let config = RecorderConfiguration {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RecorderConfiguration {
            channels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_durations() {
        let config = RecorderConfiguration {
            silence_duration: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RecorderConfiguration {
            silence_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_min_duration_above_timeout() {
        let config = RecorderConfiguration {
            min_duration: 10.0,
            timeout: 5.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("exceeds timeout"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            RecorderConfiguration::from_json_str(r#"{"sample_rate": 16000, "timeout": 30.0}"#).unwrap();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.timeout, 30.0);
        assert_eq!(config.channels, 1);
        assert_eq!(config.min_duration, 1.0);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let err = RecorderConfiguration::from_json_str(r#"{"channels": 0}"#).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfiguration(_)));

        let err = RecorderConfiguration::from_json_str("not json").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfiguration(_)));
    }

    #[test]
    fn block_counts() {
        let config = RecorderConfiguration::default();
        assert_eq!(config.blocks_for(config.silence_duration), 20);
        assert_eq!(config.blocks_for(config.min_duration), 10);
        assert_eq!(config.blocks_for(config.timeout), 3000);
        assert_eq!(config.samples_per_block(), 4410);
    }

    #[test]
    fn frame_counts() {
        let config = RecorderConfiguration::default();
        assert_eq!(config.frames_for(config.silence_duration), 88200);
        assert_eq!(config.frames_for(config.min_duration), 44100);
        assert_eq!(config.frames_for(0.3), 13230);
        assert_eq!(config.frames_for(0.0), 0);
    }
}
