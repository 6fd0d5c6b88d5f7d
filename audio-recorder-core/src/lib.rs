//! # audio-recorder-core
//!
//! Microphone recording sessions on top of a pluggable block source.
//!
//! A `CaptureSession` consumes blocks of interleaved `f32` samples from a
//! `SampleBlockSource`, meters each block, and ends the recording manually,
//! after a fixed duration, or after sustained silence. Finished buffers are
//! written as 32-bit float WAV files.
//!
//! ## Architecture
//!
//! ```text
//! audio-recorder-core (this crate)
//! ├── traits/       ← SampleBlockSource, SessionObserver
//! ├── models/       ← CaptureError, SessionState, RecorderConfiguration, AudioBuffer, etc.
//! ├── processing/   ← LevelMeter, SilenceTracker, float WAV layout
//! ├── session/      ← CaptureSession, PendingRecording, CancelHandle
//! ├── sources/      ← SyntheticSource (threaded), PushSource (caller-driven)
//! └── storage/      ← atomic WAV writer and reader
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod sources;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioBuffer, AudioLevels, AudioTransportType, InputDevice, PermissionStatus, SessionDiagnostics,
};
pub use models::config::RecorderConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::SavedRecording;
pub use models::state::{SessionState, TerminationMode};
pub use processing::level_meter::{LevelMeter, LEVEL_VISIBILITY_GAIN};
pub use processing::silence_tracker::{SilenceTracker, StopReason};
pub use processing::wav_format::DecodedWav;
pub use session::capture::CaptureSession;
pub use session::pending::{CancelHandle, PendingRecording};
pub use sources::push::{BlockFeeder, PushSource};
pub use sources::synthetic::{BlockGenerator, SyntheticSource};
pub use storage::wav_writer::{read_wav, write_wav};
pub use traits::block_source::{BlockCallback, SampleBlockSource, SourceErrorCallback};
pub use traits::session_observer::SessionObserver;
