use crate::models::audio_models::{AudioBuffer, AudioLevels};
use crate::models::error::CaptureError;
use crate::models::state::SessionState;

/// Event observer for recording session notifications.
///
/// Level updates arrive on the block source's thread; state changes arrive on
/// whichever thread caused them. The session lock is never held while an
/// observer runs. Implementations should marshal to a UI thread if needed.
pub trait SessionObserver: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &SessionState);

    /// Called once per processed block with its loudness.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called when the source or the session fails.
    fn on_error(&self, error: &CaptureError) {
        let _ = error;
    }

    /// Called when a recording completes, before the buffer is handed out.
    fn on_recording_finished(&self, buffer: &AudioBuffer) {
        let _ = buffer;
    }
}
