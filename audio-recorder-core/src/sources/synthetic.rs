//! Generator-backed block source running on its own thread.
//!
//! Stands in for a platform microphone: blocks are produced by a function of
//! the block index and delivered from a dedicated `synthetic-capture` thread,
//! optionally paced in real time.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::audio_models::{AudioTransportType, InputDevice, PermissionStatus};
use crate::models::error::CaptureError;
use crate::traits::block_source::{BlockCallback, SampleBlockSource, SourceErrorCallback};

/// Produces the block at a given index, or `None` when the signal ends.
pub type BlockGenerator = Arc<dyn Fn(u64) -> Option<Vec<f32>> + Send + Sync + 'static>;

pub struct SyntheticSource {
    sample_rate: u32,
    channels: u16,
    generator: BlockGenerator,
    pacing: Duration,
    permission: PermissionStatus,
    grant_on_request: bool,
    available: bool,
    start_error: Option<CaptureError>,
    fail_after: Option<(u64, CaptureError)>,
    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(sample_rate: u32, channels: u16, generator: BlockGenerator) -> Self {
        Self {
            sample_rate,
            channels,
            generator,
            pacing: Duration::ZERO,
            permission: PermissionStatus::Granted,
            grant_on_request: true,
            available: true,
            start_error: None,
            fail_after: None,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
        }
    }

    /// Deliver a fixed list of blocks, then report the end of input as a stream failure.
    pub fn from_blocks(sample_rate: u32, channels: u16, blocks: Vec<Vec<f32>>) -> Self {
        let blocks = Arc::new(blocks);
        Self::new(
            sample_rate,
            channels,
            Arc::new(move |index| blocks.get(index as usize).cloned()),
        )
    }

    /// Deliver blocks of `block_len` samples all equal to `value`, forever.
    pub fn constant(sample_rate: u32, channels: u16, block_len: usize, value: f32) -> Self {
        Self::new(sample_rate, channels, Arc::new(move |_| Some(vec![value; block_len])))
    }

    /// A 440 Hz tone of `amplitude` for `loud_blocks` blocks, then silence forever.
    pub fn tone_then_silence(
        sample_rate: u32,
        channels: u16,
        block_frames: usize,
        loud_blocks: u64,
        amplitude: f32,
    ) -> Self {
        let channel_count = channels as usize;
        Self::new(
            sample_rate,
            channels,
            Arc::new(move |index| {
                if index >= loud_blocks {
                    return Some(vec![0.0; block_frames * channel_count]);
                }
                let first_frame = index as usize * block_frames;
                let mut block = Vec::with_capacity(block_frames * channel_count);
                for frame in first_frame..first_frame + block_frames {
                    let t = frame as f32 / sample_rate as f32;
                    let sample = amplitude * (TAU * 440.0 * t).sin();
                    block.extend(std::iter::repeat(sample).take(channel_count));
                }
                Some(block)
            }),
        )
    }

    /// Sleep this long between blocks (real-time pacing).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
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

    /// Report `error` through the error callback instead of delivering block `index`.
    pub fn failing_after(mut self, index: u64, error: CaptureError) -> Self {
        self.fail_after = Some((index, error));
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl SampleBlockSource for SyntheticSource {
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
        if self.capture_handle.is_some() {
            return Err(CaptureError::AudioEngineSetupFailed(
                "synthetic capture already running".into(),
            ));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let generator = Arc::clone(&self.generator);
        let fail_after = self.fail_after.clone();
        let pacing = self.pacing;
        let sample_rate = self.sample_rate as f64;
        let channels = self.channels;

        let handle = thread::Builder::new()
            .name("synthetic-capture".into())
            .spawn(move || {
                let mut index = 0u64;
                while running.load(Ordering::SeqCst) {
                    if let Some((fail_index, ref error)) = fail_after {
                        if index == fail_index {
                            on_error(error.clone());
                            break;
                        }
                    }
                    let Some(block) = generator(index) else {
                        log::debug!("synthetic signal ended after {} blocks", index);
                        on_error(CaptureError::StreamFailed(format!(
                            "input ended after {} blocks",
                            index
                        )));
                        break;
                    };
                    on_block(&block, sample_rate, channels);
                    index += 1;
                    if !pacing.is_zero() {
                        thread::sleep(pacing);
                    }
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::AudioEngineSetupFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        self.capture_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            handle
                .join()
                .map_err(|_| CaptureError::StreamFailed("synthetic capture thread panicked".into()))?;
        }
        Ok(())
    }

    fn device_info(&self) -> InputDevice {
        InputDevice {
            id: "synthetic".into(),
            name: "Synthetic Input".into(),
            is_default: true,
            transport_type: Some(AudioTransportType::Virtual),
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
