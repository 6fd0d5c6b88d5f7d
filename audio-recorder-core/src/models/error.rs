use thiserror::Error;

/// Errors that can occur while recording or saving audio.
///
/// Usage errors (`AlreadyRecording`, `NotRecording`, `SessionFinished`) leave
/// the session untouched. Environment errors carry the reason reported by the
/// block source. None of them is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("session already finished; reset it or create a new one")]
    SessionFinished,

    #[error("microphone permission denied")]
    MicrophonePermissionDenied,

    #[error("no audio input available")]
    NoInputAvailable,

    #[error("audio engine setup failed: {0}")]
    AudioEngineSetupFailed(String),

    #[error("audio stream failed: {0}")]
    StreamFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("save failed: {0}")]
    SaveFailed(String),

    #[error("recording cancelled")]
    Cancelled,
}

impl CaptureError {
    /// Whether the error came from the caller using the session out of order.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRecording | Self::NotRecording | Self::SessionFinished
        )
    }

    /// Whether the error came from the audio environment (device, permission).
    pub fn is_environment_error(&self) -> bool {
        matches!(
            self,
            Self::MicrophonePermissionDenied
                | Self::NoInputAvailable
                | Self::AudioEngineSetupFailed(_)
                | Self::StreamFailed(_)
        )
    }
}
