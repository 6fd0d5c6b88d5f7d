use crate::models::config::RecorderConfiguration;

/// Why a recording ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    TargetReached,
    Silence,
    Timeout,
}

/// Counters behind until-silence termination.
///
/// Thresholds are converted from seconds to frame counts once, when the
/// tracker is created at session start, and compared against the frames
/// actually delivered. Blocks shorter or longer than the nominal
/// `block_duration` therefore keep the configured timing. The timeout is an
/// absolute ceiling: it is checked on every block, including during the
/// grace period.
#[derive(Debug, Clone)]
pub struct SilenceTracker {
    total_blocks: u64,
    total_frames: u64,
    quiet_frames: u64,
    min_frames: u64,
    silence_frames: u64,
    timeout_frames: u64,
    threshold: f32,
}

impl SilenceTracker {
    pub fn new(config: &RecorderConfiguration) -> Self {
        let tracker = Self {
            total_blocks: 0,
            total_frames: 0,
            quiet_frames: 0,
            min_frames: config.frames_for(config.min_duration),
            silence_frames: config.frames_for(config.silence_duration).max(1),
            timeout_frames: config.frames_for(config.timeout),
            threshold: config.silence_threshold,
        };
        log::debug!(
            "silence tracker: grace {} frames, silence {} frames, timeout {} frames, threshold {}",
            tracker.min_frames,
            tracker.silence_frames,
            tracker.timeout_frames,
            tracker.threshold
        );
        tracker
    }

    /// Count a block of `frames` without evaluating loudness (manual and fixed-duration modes).
    pub fn count_block(&mut self, frames: u64) {
        self.total_blocks += 1;
        self.total_frames += frames;
    }

    /// Count a block of `frames` and evaluate until-silence termination against its RMS.
    pub fn observe(&mut self, rms: f32, frames: u64) -> Option<StopReason> {
        self.count_block(frames);

        if self.total_frames >= self.timeout_frames {
            return Some(StopReason::Timeout);
        }

        if self.in_grace_period() {
            return None;
        }

        if rms < self.threshold {
            self.quiet_frames += frames;
        } else {
            self.quiet_frames = 0;
        }

        if self.quiet_frames > 0 && self.quiet_frames >= self.silence_frames {
            return Some(StopReason::Silence);
        }
        None
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frames in the current run of quiet blocks.
    pub fn quiet_frames(&self) -> u64 {
        self.quiet_frames
    }

    /// Whether the frames seen so far are still inside `min_duration`.
    pub fn in_grace_period(&self) -> bool {
        self.total_frames < self.min_frames
    }
}
