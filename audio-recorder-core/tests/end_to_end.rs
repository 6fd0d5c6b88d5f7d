use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use audio_recorder_core::{
    read_wav, AudioBuffer, AudioLevels, CaptureError, CaptureSession, PushSource, RecorderConfiguration,
    SessionObserver, SessionState, SyntheticSource,
};

const BLOCK_44K: usize = 4410;

fn loud_then_silent(loud: usize, silent: usize) -> Vec<Vec<f32>> {
    let mut blocks = vec![vec![0.5f32; BLOCK_44K]; loud];
    blocks.extend(vec![vec![0.0f32; BLOCK_44K]; silent]);
    blocks
}

/// 8 kHz mono, 100 ms blocks: grace 5 blocks, silence 3 blocks, timeout 20 blocks.
fn short_config() -> RecorderConfiguration {
    RecorderConfiguration {
        sample_rate: 8000,
        silence_duration: 0.3,
        timeout: 2.0,
        min_duration: 0.5,
        ..Default::default()
    }
}

#[derive(Default)]
struct Transitions {
    states: Mutex<Vec<SessionState>>,
    level_updates: Mutex<usize>,
}

impl SessionObserver for Transitions {
    fn on_state_changed(&self, state: &SessionState) {
        self.states.lock().push(state.clone());
    }

    fn on_levels_updated(&self, _levels: &AudioLevels) {
        *self.level_updates.lock() += 1;
    }

    fn on_recording_finished(&self, _buffer: &AudioBuffer) {}
}

#[test]
fn speech_then_silence_with_pushed_blocks() {
    let (source, feeder) = PushSource::new(44100, 1);
    let mut session = CaptureSession::new(source, RecorderConfiguration::default()).unwrap();
    let pending = session.begin_until_silence().unwrap();

    let mut delivered = 0;
    for block in loud_then_silent(10, 21) {
        if pending.state() != SessionState::Recording {
            break;
        }
        feeder.push(&block);
        delivered += 1;
    }
    assert_eq!(delivered, 30);

    let buffer = pending.wait().unwrap();
    assert_eq!(buffer.len(), 30 * BLOCK_44K);
    assert!(buffer.samples[..10 * BLOCK_44K].iter().all(|&s| s == 0.5));
    assert!(buffer.samples[10 * BLOCK_44K..].iter().all(|&s| s == 0.0));
    assert_eq!(session.state(), SessionState::Completed);
}

#[test]
fn speech_then_silence_on_capture_thread() {
    let source = SyntheticSource::from_blocks(44100, 1, loud_then_silent(10, 21));
    let mut session = CaptureSession::new(source, RecorderConfiguration::default()).unwrap();

    let buffer = session.record_until_silence().unwrap();

    assert_eq!(buffer.len(), 30 * BLOCK_44K);
    assert!((buffer.duration_secs() - 3.0).abs() < 1e-9);
}

#[test]
fn fixed_duration_on_capture_thread() {
    let source = SyntheticSource::constant(8000, 1, 700, 0.3);
    let mut session = CaptureSession::new(source, short_config()).unwrap();

    let buffer = session.record_audio(0.25).unwrap();

    assert_eq!(buffer.len(), 2000);
    assert!(buffer.samples.iter().all(|&s| s == 0.3));
}

#[test]
fn tone_then_silence_notifies_observer() {
    let source = SyntheticSource::tone_then_silence(8000, 1, 800, 5, 0.5);
    let mut session = CaptureSession::new(source, short_config()).unwrap();
    let transitions = Arc::new(Transitions::default());
    session.set_observer(transitions.clone());

    let buffer = session.record_until_silence().unwrap();

    assert_eq!(buffer.len(), 8 * 800);
    assert_eq!(
        transitions.states.lock().as_slice(),
        &[SessionState::Recording, SessionState::Completed]
    );
    assert!(*transitions.level_updates.lock() >= 8);
}

#[test]
fn constant_noise_hits_timeout() {
    let source = SyntheticSource::constant(8000, 1, 800, 0.2);
    let mut session = CaptureSession::new(source, short_config()).unwrap();

    let buffer = session.record_until_silence().unwrap();

    assert_eq!(buffer.len(), 20 * 800);
}

#[test]
fn cancel_from_another_thread() {
    let source = SyntheticSource::constant(8000, 1, 80, 0.3).with_pacing(Duration::from_millis(2));
    let mut session = CaptureSession::new(source, RecorderConfiguration::default()).unwrap();

    let pending = session.begin_until_silence().unwrap();
    let cancel = pending.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        cancel.cancel()
    });

    assert_eq!(pending.wait(), Err(CaptureError::Cancelled));
    assert!(canceller.join().unwrap());
    assert_eq!(session.state(), SessionState::Cancelled);

    session.reset().unwrap();
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn source_failure_reaches_waiter() {
    let source = SyntheticSource::constant(8000, 1, 800, 0.3)
        .failing_after(3, CaptureError::StreamFailed("device unplugged".into()));
    let mut session = CaptureSession::new(source, short_config()).unwrap();

    assert_eq!(
        session.record_until_silence(),
        Err(CaptureError::StreamFailed("device unplugged".into()))
    );
    assert!(matches!(session.state(), SessionState::Failed(_)));
}

#[test]
fn input_ending_early_resolves_the_wait() {
    let source = SyntheticSource::from_blocks(44100, 1, loud_then_silent(3, 0));
    let mut session = CaptureSession::new(source, RecorderConfiguration::default()).unwrap();

    let err = session.record_until_silence().unwrap_err();

    assert_eq!(err, CaptureError::StreamFailed("input ended after 3 blocks".into()));
    assert_eq!(session.state(), SessionState::Failed(err));
}

#[test]
fn input_ending_before_fixed_target_resolves_the_wait() {
    let source = SyntheticSource::from_blocks(8000, 1, vec![vec![0.3; 800]; 2]);
    let mut session = CaptureSession::new(source, short_config()).unwrap();

    assert!(matches!(session.record_audio(1.0), Err(CaptureError::StreamFailed(_))));
}

#[test]
fn permission_denied_before_capture() {
    let source = SyntheticSource::constant(8000, 1, 800, 0.3)
        .with_permission(audio_recorder_core::PermissionStatus::Denied, false);
    let mut session = CaptureSession::new(source, short_config()).unwrap();

    assert_eq!(session.record_audio(1.0), Err(CaptureError::MicrophonePermissionDenied));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn recording_saves_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recordings").join("take.wav");

    let config = RecorderConfiguration {
        channels: 2,
        ..short_config()
    };
    let source = SyntheticSource::tone_then_silence(8000, 2, 400, 100, 0.4);
    let mut session = CaptureSession::new(source, config).unwrap();

    let buffer = session.record_audio(0.5).unwrap();
    assert_eq!(buffer.frame_count(), 4000);

    let saved = session.save_recording(&buffer, &path).unwrap();
    assert_eq!(saved.file_path, path);
    assert_eq!(saved.frame_count, 4000);
    assert_eq!(saved.channels, 2);
    assert_eq!(saved.checksum.len(), 64);

    let decoded = read_wav(&path).unwrap();
    assert_eq!(decoded.sample_rate, 8000);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.samples, buffer.samples);

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 8000);
}
