//! Caller-driven block source.
//!
//! `PushSource` is handed to a session; the paired `BlockFeeder` delivers
//! blocks synchronously on whichever thread calls it. Useful wherever block
//! timing has to be deterministic.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{InputDevice, PermissionStatus};
use crate::models::error::CaptureError;
use crate::traits::block_source::{BlockCallback, SampleBlockSource, SourceErrorCallback};

#[derive(Default)]
struct FeedLink {
    on_block: Option<BlockCallback>,
    on_error: Option<SourceErrorCallback>,
    starts: usize,
    stops: usize,
}

/// Block source whose blocks are pushed through a [`BlockFeeder`].
pub struct PushSource {
    link: Arc<Mutex<FeedLink>>,
    permission: PermissionStatus,
    grant_on_request: bool,
    available: bool,
    start_error: Option<CaptureError>,
}

impl PushSource {
    pub fn new(sample_rate: u32, channels: u16) -> (Self, BlockFeeder) {
        let link = Arc::new(Mutex::new(FeedLink::default()));
        let source = Self {
            link: Arc::clone(&link),
            permission: PermissionStatus::Granted,
            grant_on_request: true,
            available: true,
            start_error: None,
        };
        let feeder = BlockFeeder {
            link,
            sample_rate: sample_rate as f64,
            channels,
        };
        (source, feeder)
    }

    pub fn with_permission(mut self, permission: PermissionStatus, grant_on_request: bool) -> Self {
        self.permission = permission;
        self.grant_on_request = grant_on_request;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Make `start` fail with `error`.
    pub fn failing_start(mut self, error: CaptureError) -> Self {
        self.start_error = Some(error);
        self
    }
}

impl SampleBlockSource for PushSource {
    fn permission_status(&self) -> PermissionStatus {
        self.permission
    }

    fn request_permission(&mut self) -> PermissionStatus {
        if self.permission == PermissionStatus::Undetermined {
            self.permission = if self.grant_on_request {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
        }
        self.permission
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&mut self, on_block: BlockCallback, on_error: SourceErrorCallback) -> Result<(), CaptureError> {
        if let Some(ref error) = self.start_error {
            return Err(error.clone());
        }
        let mut link = self.link.lock();
        if link.on_block.is_some() {
            return Err(CaptureError::AudioEngineSetupFailed("push source already started".into()));
        }
        link.on_block = Some(on_block);
        link.on_error = Some(on_error);
        link.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let mut link = self.link.lock();
        link.on_block = None;
        link.on_error = None;
        link.stops += 1;
        Ok(())
    }

    fn device_info(&self) -> InputDevice {
        InputDevice {
            id: "push".into(),
            name: "Push Source".into(),
            is_default: false,
            transport_type: None,
        }
    }
}

/// Delivers blocks to a started [`PushSource`].
#[derive(Clone)]
pub struct BlockFeeder {
    link: Arc<Mutex<FeedLink>>,
    sample_rate: f64,
    channels: u16,
}

impl BlockFeeder {
    /// Deliver one block in the source's format. Returns `false` if the source is stopped.
    pub fn push(&self, samples: &[f32]) -> bool {
        self.push_with_format(samples, self.sample_rate, self.channels)
    }

    /// Deliver one block in an explicit format.
    pub fn push_with_format(&self, samples: &[f32], sample_rate: f64, channels: u16) -> bool {
        // Held across the callback so `stop` cannot return mid-delivery.
        let link = self.link.lock();
        match link.on_block {
            Some(ref on_block) => {
                on_block(samples, sample_rate, channels);
                true
            }
            None => false,
        }
    }

    /// Deliver `count` blocks of `len` samples, all equal to `value`.
    pub fn push_constant(&self, value: f32, len: usize, count: usize) -> usize {
        let block = vec![value; len];
        (0..count).take_while(|_| self.push(&block)).count()
    }

    /// Report a runtime failure. Returns `false` if the source is stopped.
    pub fn fail(&self, error: CaptureError) -> bool {
        let link = self.link.lock();
        match link.on_error {
            Some(ref on_error) => {
                on_error(error);
                true
            }
            None => false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.link.lock().on_block.is_some()
    }

    pub fn start_count(&self) -> usize {
        self.link.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.link.lock().stops
    }
}
