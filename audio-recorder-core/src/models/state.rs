use super::error::CaptureError;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → completed
///            ↓    ↘
///         failed   cancelled
/// ```
/// Completed, failed and cancelled are terminal until `reset`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Recording,
    Completed,
    Failed(CaptureError),
    Cancelled,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }
}

/// How a recording ends. Chosen at start and fixed for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationMode {
    /// Runs until `stop_recording`.
    Manual,
    /// Ends once exactly `target_frames` frames have been captured.
    FixedDuration { target_frames: usize },
    /// Ends after sustained quiet or at the timeout ceiling.
    UntilSilence,
}

impl TerminationMode {
    /// Whether a caller awaits the outcome of this mode.
    pub fn is_awaited(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Recording.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::Failed(CaptureError::NoInputAvailable).is_terminal());
    }

    #[test]
    fn awaited_modes() {
        assert!(!TerminationMode::Manual.is_awaited());
        assert!(TerminationMode::UntilSilence.is_awaited());
        assert!(TerminationMode::FixedDuration { target_frames: 10 }.is_awaited());
    }
}
