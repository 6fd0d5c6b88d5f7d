use crate::models::audio_models::AudioLevels;

/// Gain applied to RMS before clamping for display.
///
/// Speech RMS usually sits well below 0.1, so a ×10 gain spreads it across the
/// meter. Display only; termination decisions use the raw RMS.
pub const LEVEL_VISIBILITY_GAIN: f32 = 10.0;

/// Pure-math loudness metering over blocks of f32 samples.
pub struct LevelMeter;

impl LevelMeter {
    /// Root-mean-square of the samples, 0.0 for an empty block.
    pub fn compute_rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }

    /// RMS mapped into 0.0–1.0 for a level meter.
    pub fn scaled_level(rms: f32) -> f32 {
        (rms * LEVEL_VISIBILITY_GAIN).clamp(0.0, 1.0)
    }

    /// Peak absolute sample value.
    pub fn peak_level(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    pub fn measure(samples: &[f32]) -> AudioLevels {
        let rms = Self::compute_rms(samples);
        AudioLevels {
            rms,
            peak: Self::peak_level(samples),
            display: Self::scaled_level(rms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rms_of_empty_block_is_zero() {
        assert_eq!(LevelMeter::compute_rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(LevelMeter::compute_rms(&[0.0; 441]), 0.0);
    }

    #[test]
    fn rms_of_constant_block_is_its_magnitude() {
        assert_relative_eq!(LevelMeter::compute_rms(&[0.5; 100]), 0.5, epsilon = 1e-6);
        assert_relative_eq!(LevelMeter::compute_rms(&[-0.25; 100]), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn rms_of_alternating_signs() {
        let block: Vec<f32> = (0..1000).map(|i| if i % 2 == 0 { 0.3 } else { -0.3 }).collect();
        assert_relative_eq!(LevelMeter::compute_rms(&block), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn scaled_level_clamps() {
        assert_relative_eq!(LevelMeter::scaled_level(0.05), 0.5, epsilon = 1e-6);
        assert_eq!(LevelMeter::scaled_level(0.5), 1.0);
        assert_eq!(LevelMeter::scaled_level(0.0), 0.0);
    }

    #[test]
    fn measure_reports_peak() {
        let levels = LevelMeter::measure(&[0.1, -0.5, 0.3]);
        assert_relative_eq!(levels.peak, 0.5, epsilon = 1e-6);
        assert!(levels.rms > 0.0 && levels.rms < 0.5);
        assert_eq!(levels.display, 1.0);
    }
}
