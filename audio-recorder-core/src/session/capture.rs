use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{AudioBuffer, AudioLevels, InputDevice, PermissionStatus, SessionDiagnostics};
use crate::models::config::RecorderConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::SavedRecording;
use crate::models::state::{SessionState, TerminationMode};
use crate::processing::level_meter::LevelMeter;
use crate::processing::silence_tracker::{SilenceTracker, StopReason};
use crate::processing::wav_format;
use crate::storage::wav_writer;
use crate::traits::block_source::SampleBlockSource;
use crate::traits::session_observer::SessionObserver;

use super::pending::{CancelHandle, OutcomeSlot, PendingRecording};

/// Internal mutable session state, protected by `parking_lot::Mutex`.
pub(crate) struct SessionInner {
    pub(crate) state: SessionState,
    pub(crate) buffer: Vec<f32>,
    pub(crate) outcome: OutcomeSlot,
    /// Incremented for every recording; ties cancel handles to the recording they came from.
    pub(crate) generation: u64,
    mode: TerminationMode,
    tracker: SilenceTracker,
    levels: AudioLevels,
    captured_samples: usize,
    started_at: Option<DateTime<Utc>>,
    diagnostics: SessionDiagnostics,
}

impl SessionInner {
    fn new(config: &RecorderConfiguration) -> Self {
        Self {
            state: SessionState::Idle,
            buffer: Vec::new(),
            outcome: OutcomeSlot::Empty,
            generation: 0,
            mode: TerminationMode::Manual,
            tracker: SilenceTracker::new(config),
            levels: AudioLevels::default(),
            captured_samples: 0,
            started_at: None,
            diagnostics: SessionDiagnostics::default(),
        }
    }

    /// Transition to `Completed` and hand the buffer to a pending waiter, if any.
    ///
    /// Returns the buffer when nobody is waiting on it (manual stop).
    fn complete(&mut self, config: &RecorderConfiguration, reason: StopReason) -> Option<AudioBuffer> {
        let buffer = AudioBuffer {
            samples: std::mem::take(&mut self.buffer),
            sample_rate: config.sample_rate,
            channels: config.channels,
        };
        self.captured_samples = buffer.len();
        self.state = SessionState::Completed;
        log::info!(
            "recording completed ({:?}) after {} blocks, {:.2}s",
            reason,
            self.tracker.total_blocks(),
            buffer.duration_secs()
        );

        if self.outcome.is_pending() {
            self.outcome.resolve(Ok(buffer));
            None
        } else {
            Some(buffer)
        }
    }

    /// Fresh state for the next recording, keeping the generation counter.
    fn renew(&mut self, config: &RecorderConfiguration) {
        let generation = self.generation;
        *self = Self::new(config);
        self.generation = generation;
    }

    fn fail(&mut self, error: CaptureError) {
        log::error!("recording failed: {}", error);
        self.state = SessionState::Failed(error.clone());
        self.buffer.clear();
        if self.outcome.is_pending() {
            self.outcome.resolve(Err(error));
        }
    }
}

/// State shared between the session owner and the source's delivery thread.
pub(crate) struct SessionShared {
    pub(crate) inner: Mutex<SessionInner>,
    pub(crate) finished: Condvar,
    config: RecorderConfiguration,
}

impl SessionShared {
    /// Core block processing: append → count → meter → termination check.
    fn process_block(&self, samples: &[f32], sample_rate: f64, channels: u16) -> BlockEffects {
        let config = &self.config;
        let mut inner = self.inner.lock();

        if !inner.state.is_recording() {
            inner.diagnostics.late_blocks_ignored += 1;
            log::trace!("ignoring block of {} samples after termination", samples.len());
            return BlockEffects::default();
        }

        if (sample_rate - config.sample_rate as f64).abs() > 0.5 {
            let error = CaptureError::StreamFailed(format!(
                "block sample rate {} Hz does not match configured {} Hz",
                sample_rate, config.sample_rate
            ));
            return self.fail_locked(&mut inner, error);
        }

        let block: Cow<'_, [f32]> = if channels == config.channels {
            Cow::Borrowed(samples)
        } else if config.channels == 1 && channels > 1 {
            inner.diagnostics.downmixed_blocks += 1;
            Cow::Owned(wav_format::downmix_to_mono(samples, channels as usize))
        } else {
            let error = CaptureError::StreamFailed(format!(
                "block has {} channel(s), session expects {}",
                channels, config.channels
            ));
            return self.fail_locked(&mut inner, error);
        };

        if block.len() != config.samples_per_block() {
            if inner.diagnostics.irregular_blocks == 0 {
                log::warn!(
                    "block of {} samples differs from the nominal {}; silence timing follows captured frames",
                    block.len(),
                    config.samples_per_block()
                );
            }
            inner.diagnostics.irregular_blocks += 1;
        }

        let frames = (block.len() / config.channels as usize) as u64;
        inner.buffer.extend_from_slice(&block);
        inner.diagnostics.blocks_processed += 1;
        inner.diagnostics.samples_captured += block.len() as u64;

        let levels = LevelMeter::measure(&block);
        inner.levels = levels;

        let mode = inner.mode;
        let stop = match mode {
            TerminationMode::Manual => {
                inner.tracker.count_block(frames);
                None
            }
            TerminationMode::FixedDuration { target_frames } => {
                inner.tracker.count_block(frames);
                let target = target_frames * config.channels as usize;
                if inner.buffer.len() >= target {
                    inner.buffer.truncate(target);
                    Some(StopReason::TargetReached)
                } else {
                    None
                }
            }
            TerminationMode::UntilSilence => inner.tracker.observe(levels.rms, frames),
        };
        inner.diagnostics.quiet_frames = inner.tracker.quiet_frames();

        let mut effects = BlockEffects {
            levels: Some(levels),
            ..Default::default()
        };
        if let Some(reason) = stop {
            // Awaited modes always have a pending waiter; the buffer goes there.
            let _ = inner.complete(config, reason);
            self.finished.notify_all();
            effects.state = Some(SessionState::Completed);
        }
        effects
    }

    fn handle_source_error(&self, error: CaptureError) -> BlockEffects {
        let mut inner = self.inner.lock();
        if !inner.state.is_recording() {
            log::debug!("ignoring source error after termination: {}", error);
            return BlockEffects::default();
        }
        let error = match error {
            e @ CaptureError::StreamFailed(_) => e,
            other => CaptureError::StreamFailed(other.to_string()),
        };
        self.fail_locked(&mut inner, error)
    }

    fn fail_locked(&self, inner: &mut SessionInner, error: CaptureError) -> BlockEffects {
        inner.fail(error.clone());
        self.finished.notify_all();
        BlockEffects {
            levels: None,
            state: Some(SessionState::Failed(error.clone())),
            error: Some(error),
        }
    }
}

/// Observer notifications gathered under the lock and sent after releasing it.
#[derive(Default)]
struct BlockEffects {
    levels: Option<AudioLevels>,
    state: Option<SessionState>,
    error: Option<CaptureError>,
}

impl BlockEffects {
    fn dispatch(self, observer: Option<&Arc<dyn SessionObserver>>) {
        let Some(observer) = observer else {
            return;
        };
        if let Some(ref levels) = self.levels {
            observer.on_levels_updated(levels);
        }
        if let Some(ref error) = self.error {
            observer.on_error(error);
        }
        if let Some(ref state) = self.state {
            observer.on_state_changed(state);
        }
    }
}

/// Microphone recording session.
///
/// Generic over the platform input via `SampleBlockSource`. Blocks are
/// processed one at a time under the session lock, in delivery order:
/// ```text
/// [Source thread] → append → count → level → termination check → (complete)
/// ```
/// A session records once; after it completes, fails or is cancelled it must
/// be `reset` (or replaced) before recording again.
pub struct CaptureSession<S: SampleBlockSource> {
    source: S,
    shared: Arc<SessionShared>,
    observer: Option<Arc<dyn SessionObserver>>,
    source_active: bool,
}

impl<S: SampleBlockSource> CaptureSession<S> {
    pub fn new(source: S, config: RecorderConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfiguration)?;
        Ok(Self {
            source,
            shared: Arc::new(SessionShared {
                inner: Mutex::new(SessionInner::new(&config)),
                finished: Condvar::new(),
                config,
            }),
            observer: None,
            source_active: false,
        })
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observer = Some(observer);
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.shared.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.inner.lock().state.is_recording()
    }

    /// Display level (0.0–1.0) of the most recent block.
    pub fn current_level(&self) -> f32 {
        self.shared.inner.lock().levels.display
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.shared.inner.lock().levels
    }

    /// Seconds of audio captured by the current (or last) recording.
    pub fn recording_duration(&self) -> f64 {
        let inner = self.shared.inner.lock();
        let samples = if inner.state.is_recording() {
            inner.buffer.len()
        } else {
            inner.captured_samples
        };
        let config = &self.shared.config;
        (samples / config.channels as usize) as f64 / config.sample_rate as f64
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.shared.inner.lock().started_at
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.inner.lock().diagnostics.clone()
    }

    pub fn device_info(&self) -> InputDevice {
        self.source.device_info()
    }

    /// Ask the source for microphone access.
    pub fn request_permission(&mut self) -> PermissionStatus {
        let status = self.source.request_permission();
        log::info!("microphone permission: {:?}", status);
        status
    }

    /// Start a manual recording. Transitions: idle → recording.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.begin(TerminationMode::Manual)
    }

    /// Stop a recording and return the captured audio.
    /// Transitions: recording → completed.
    ///
    /// If the source failed mid-recording, the source is released and the
    /// stored failure is returned once; later calls report `NotRecording`.
    pub fn stop_recording(&mut self) -> Result<AudioBuffer, CaptureError> {
        match self.state() {
            SessionState::Recording => {}
            SessionState::Failed(error) if self.source_active => {
                self.release_source();
                return Err(error);
            }
            _ => return Err(CaptureError::NotRecording),
        }

        // No more blocks after this returns.
        self.release_source();

        let result = {
            let mut inner = self.shared.inner.lock();
            match inner.state.clone() {
                SessionState::Recording => {
                    let buffer = inner.complete(&self.shared.config, StopReason::Manual);
                    self.shared.finished.notify_all();
                    buffer.ok_or(CaptureError::NotRecording)
                }
                SessionState::Failed(error) => Err(error),
                _ => Err(CaptureError::NotRecording),
            }
        };

        if let Ok(ref buffer) = result {
            self.notify_state(&SessionState::Completed);
            self.notify_finished(buffer);
        }
        result
    }

    /// Start recording exactly `duration_secs` of audio.
    ///
    /// The returned handle yields `floor(duration_secs * sample_rate)` frames.
    pub fn begin_fixed_duration(&mut self, duration_secs: f64) -> Result<PendingRecording<'_, S>, CaptureError> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(CaptureError::InvalidConfiguration(format!(
                "invalid recording duration: {}",
                duration_secs
            )));
        }
        let target_frames = fixed_target_frames(duration_secs, self.shared.config.sample_rate);
        if target_frames == 0 {
            return Err(CaptureError::InvalidConfiguration(format!(
                "duration {}s is shorter than one frame",
                duration_secs
            )));
        }
        self.begin(TerminationMode::FixedDuration { target_frames })?;
        Ok(PendingRecording::new(self))
    }

    /// Start recording until sustained silence or the timeout.
    pub fn begin_until_silence(&mut self) -> Result<PendingRecording<'_, S>, CaptureError> {
        self.begin(TerminationMode::UntilSilence)?;
        Ok(PendingRecording::new(self))
    }

    /// Record `duration_secs` of audio, blocking until done.
    pub fn record_audio(&mut self, duration_secs: f64) -> Result<AudioBuffer, CaptureError> {
        self.begin_fixed_duration(duration_secs)?.wait()
    }

    /// Record until silence (or the timeout), blocking until done.
    pub fn record_until_silence(&mut self) -> Result<AudioBuffer, CaptureError> {
        self.begin_until_silence()?.wait()
    }

    /// Write a captured buffer to `destination` as a float WAV file.
    pub fn save_recording(&self, buffer: &AudioBuffer, destination: &Path) -> Result<SavedRecording, CaptureError> {
        wav_writer::write_wav(&buffer.samples, destination, buffer.sample_rate, buffer.channels)
    }

    /// Return a finished session to idle. Transitions: completed/failed/cancelled → idle.
    pub fn reset(&mut self) -> Result<(), CaptureError> {
        let state = self.state();
        if state.is_recording() {
            return Err(CaptureError::AlreadyRecording);
        }
        if state.is_idle() {
            return Ok(());
        }
        self.release_source();
        self.shared.inner.lock().renew(&self.shared.config);
        self.notify_state(&SessionState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    pub(crate) fn shared(&self) -> &Arc<SessionShared> {
        &self.shared
    }

    pub(crate) fn cancel_handle(&self) -> CancelHandle {
        let generation = self.shared.inner.lock().generation;
        CancelHandle::new(Arc::clone(&self.shared), self.observer.clone(), generation)
    }

    /// Stop the source if it is running. Never called from the delivery thread.
    pub(crate) fn release_source(&mut self) {
        if !self.source_active {
            return;
        }
        self.source_active = false;
        if let Err(e) = self.source.stop() {
            log::warn!("failed to stop block source: {}", e);
        }
    }

    pub(crate) fn notify_finished(&self, buffer: &AudioBuffer) {
        if let Some(ref observer) = self.observer {
            observer.on_recording_finished(buffer);
        }
    }

    fn notify_state(&self, state: &SessionState) {
        if let Some(ref observer) = self.observer {
            observer.on_state_changed(state);
        }
    }

    fn notify_error(&self, error: &CaptureError) {
        if let Some(ref observer) = self.observer {
            observer.on_error(error);
        }
    }

    fn begin(&mut self, mode: TerminationMode) -> Result<(), CaptureError> {
        {
            let inner = self.shared.inner.lock();
            let state = &inner.state;
            if state.is_recording() {
                return Err(CaptureError::AlreadyRecording);
            }
            if state.is_terminal() {
                return Err(CaptureError::SessionFinished);
            }
        }

        match self.source.permission_status() {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => return Err(CaptureError::MicrophonePermissionDenied),
            PermissionStatus::Undetermined => {
                if self.request_permission() != PermissionStatus::Granted {
                    return Err(CaptureError::MicrophonePermissionDenied);
                }
            }
        }
        if !self.source.is_available() {
            return Err(CaptureError::NoInputAvailable);
        }

        {
            let mut inner = self.shared.inner.lock();
            inner.renew(&self.shared.config);
            inner.generation += 1;
            inner.mode = mode;
            inner.started_at = Some(Utc::now());
            inner.state = SessionState::Recording;
            if mode.is_awaited() {
                inner.outcome = OutcomeSlot::Pending;
            }
        }
        log::info!("recording started ({:?})", mode);
        self.notify_state(&SessionState::Recording);

        let block_shared = Arc::clone(&self.shared);
        let block_observer = self.observer.clone();
        let on_block = Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            block_shared
                .process_block(samples, sample_rate, channels)
                .dispatch(block_observer.as_ref());
        });

        let error_shared = Arc::clone(&self.shared);
        let error_observer = self.observer.clone();
        let on_error = Arc::new(move |error: CaptureError| {
            error_shared
                .handle_source_error(error)
                .dispatch(error_observer.as_ref());
        });

        if let Err(e) = self.source.start(on_block, on_error) {
            {
                let mut inner = self.shared.inner.lock();
                inner.fail(e.clone());
                inner.outcome = OutcomeSlot::Empty;
            }
            self.notify_error(&e);
            self.notify_state(&SessionState::Failed(e.clone()));
            return Err(e);
        }
        self.source_active = true;
        Ok(())
    }
}

/// `floor(duration_secs * sample_rate)`, treating products within rounding
/// noise of an integer as that integer (2.3 s at 100 Hz is 230 frames, not 229).
fn fixed_target_frames(duration_secs: f64, sample_rate: u32) -> usize {
    let product = duration_secs * sample_rate as f64;
    let nearest = product.round();
    if (product - nearest).abs() < 1e-6 {
        nearest as usize
    } else {
        product.floor() as usize
    }
}

impl<S: SampleBlockSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.release_source();
    }
}
