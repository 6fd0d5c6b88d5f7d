use std::sync::Arc;

use crate::models::audio_models::{InputDevice, PermissionStatus};
use crate::models::error::CaptureError;

/// Callback invoked for every delivered block.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type BlockCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Callback invoked when the source fails after a successful `start`.
pub type SourceErrorCallback = Arc<dyn Fn(CaptureError) + Send + Sync + 'static>;

/// A platform input that delivers fixed-duration sample blocks.
///
/// Implementations deliver blocks one at a time, in order, from their own
/// thread. Callbacks must not be invoked after `stop` returns.
///
/// A source whose input ends on its own (device removed, file exhausted)
/// must report it through `on_error`; a session awaiting silence or a
/// target length would otherwise never finish. Blocks may be any length:
/// the session measures time in delivered frames.
pub trait SampleBlockSource: Send {
    /// Current microphone permission.
    fn permission_status(&self) -> PermissionStatus;

    /// Ask the platform for microphone access; returns the resulting status.
    fn request_permission(&mut self) -> PermissionStatus;

    /// Whether an input device is present.
    fn is_available(&self) -> bool;

    /// Start delivering blocks to `on_block`; runtime failures go to `on_error`.
    fn start(&mut self, on_block: BlockCallback, on_error: SourceErrorCallback) -> Result<(), CaptureError>;

    /// Stop delivering and release the device.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Information about the device backing this source.
    fn device_info(&self) -> InputDevice;
}
