use std::sync::Arc;
use std::time::Duration;

use crate::models::audio_models::AudioBuffer;
use crate::models::error::CaptureError;
use crate::models::state::SessionState;
use crate::traits::block_source::SampleBlockSource;
use crate::traits::session_observer::SessionObserver;

use super::capture::{CaptureSession, SessionShared};

/// Outcome of an awaited recording. Filled at most once per recording.
#[derive(Debug, Default)]
pub(crate) enum OutcomeSlot {
    /// No awaited recording in flight (idle or manual mode).
    #[default]
    Empty,
    Pending,
    Resolved(Result<AudioBuffer, CaptureError>),
    /// The resolved outcome has been handed to the caller.
    Taken,
}

impl OutcomeSlot {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Fill a pending slot. Refuses, and reports `false`, if the slot is not pending.
    pub(crate) fn resolve(&mut self, outcome: Result<AudioBuffer, CaptureError>) -> bool {
        if !self.is_pending() {
            log::error!("refusing to resolve a recording outcome twice (slot: {:?})", self);
            return false;
        }
        *self = Self::Resolved(outcome);
        true
    }

    /// Move a resolved outcome out, leaving `Taken`. `None` while still pending.
    pub(crate) fn take(&mut self) -> Option<Result<AudioBuffer, CaptureError>> {
        match std::mem::replace(self, Self::Taken) {
            Self::Resolved(outcome) => Some(outcome),
            Self::Pending => {
                *self = Self::Pending;
                None
            }
            Self::Empty | Self::Taken => Some(Err(CaptureError::NotRecording)),
        }
    }
}

/// Cancels an in-flight awaited recording from any thread.
///
/// A handle only ever affects the recording it was taken from; once that
/// recording has finished it is inert, even after the session is reset and
/// records again.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<SessionShared>,
    observer: Option<Arc<dyn SessionObserver>>,
    generation: u64,
}

impl CancelHandle {
    pub(crate) fn new(
        shared: Arc<SessionShared>,
        observer: Option<Arc<dyn SessionObserver>>,
        generation: u64,
    ) -> Self {
        Self {
            shared,
            observer,
            generation,
        }
    }

    /// Cancel the recording: the session moves to `Cancelled`, the captured
    /// audio is discarded and the waiter receives `CaptureError::Cancelled`.
    ///
    /// Returns `false` if the recording had already finished.
    pub fn cancel(&self) -> bool {
        let cancelled = {
            let mut inner = self.shared.inner.lock();
            let current = inner.generation == self.generation;
            if current && inner.state.is_recording() && inner.outcome.is_pending() {
                inner.state = SessionState::Cancelled;
                inner.buffer.clear();
                inner.outcome.resolve(Err(CaptureError::Cancelled));
                self.shared.finished.notify_all();
                true
            } else {
                false
            }
        };

        if cancelled {
            log::info!("recording cancelled");
            if let Some(ref observer) = self.observer {
                observer.on_state_changed(&SessionState::Cancelled);
            }
        }
        cancelled
    }
}

/// An awaited recording in progress (fixed-duration or until-silence).
///
/// Holds the session mutably until the outcome is collected. Dropping it
/// without waiting cancels the recording and releases the source.
pub struct PendingRecording<'a, S: SampleBlockSource> {
    session: &'a mut CaptureSession<S>,
    done: bool,
}

impl<'a, S: SampleBlockSource> PendingRecording<'a, S> {
    pub(crate) fn new(session: &'a mut CaptureSession<S>) -> Self {
        Self { session, done: false }
    }

    /// Block until the recording terminates, then release the source and
    /// return the captured audio.
    pub fn wait(mut self) -> Result<AudioBuffer, CaptureError> {
        let outcome = {
            let shared = self.session.shared();
            let mut inner = shared.inner.lock();
            loop {
                if let Some(outcome) = inner.outcome.take() {
                    break outcome;
                }
                shared.finished.wait(&mut inner);
            }
        };
        self.finish(outcome)
    }

    /// Wait at most `timeout`. `Ok(None)` means the recording is still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<AudioBuffer>, CaptureError> {
        if self.done {
            return Err(CaptureError::NotRecording);
        }
        let outcome = {
            let shared = self.session.shared();
            let mut inner = shared.inner.lock();
            if inner.outcome.is_pending() {
                shared.finished.wait_for(&mut inner, timeout);
            }
            inner.outcome.take()
        };
        match outcome {
            Some(outcome) => self.finish(outcome).map(Some),
            None => Ok(None),
        }
    }

    /// Handle for cancelling this recording from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.session.cancel_handle()
    }

    /// Cancel now and release the source.
    pub fn cancel(mut self) {
        self.cancel_handle().cancel();
        self.session.release_source();
        self.done = true;
    }

    /// Current state of the underlying session.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Seconds of audio captured so far.
    pub fn recording_duration(&self) -> f64 {
        self.session.recording_duration()
    }

    fn finish(&mut self, outcome: Result<AudioBuffer, CaptureError>) -> Result<AudioBuffer, CaptureError> {
        self.done = true;
        self.session.release_source();
        if let Ok(ref buffer) = outcome {
            self.session.notify_finished(buffer);
        }
        outcome
    }
}

impl<S: SampleBlockSource> Drop for PendingRecording<'_, S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        log::debug!("pending recording dropped before completion");
        self.session.cancel_handle().cancel();
        self.session.release_source();
    }
}
