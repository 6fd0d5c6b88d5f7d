use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use audio_recorder_core::{
    AudioBuffer, AudioLevels, CaptureError, CaptureSession, RecorderConfiguration, SessionObserver, SessionState,
    SyntheticSource,
};

/// Record from a synthetic microphone and save the result as a float WAV file
#[derive(Parser)]
#[command(name = "audio-recorder-demo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Where to write the recording
    #[arg(long, short, default_value = "recording.wav", global = true)]
    output: PathBuf,

    /// JSON recorder configuration; missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured sample rate (Hz)
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Seconds of tone the synthetic input plays before going quiet
    #[arg(long, default_value_t = 1.5, global = true)]
    loud_secs: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a fixed number of seconds
    Fixed {
        #[arg(long)]
        seconds: f64,
    },

    /// Record until the input stays quiet
    UntilSilence,
}

/// Logs meter readings roughly once per second of audio.
struct LevelLogger {
    blocks: AtomicU64,
    every: u64,
}

impl SessionObserver for LevelLogger {
    fn on_state_changed(&self, state: &SessionState) {
        log::info!("session state: {:?}", state);
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        let n = self.blocks.fetch_add(1, Ordering::Relaxed);
        if n % self.every == 0 {
            log::info!(
                "level {:>5.2} (rms {:.4}, peak {:.4})",
                levels.display,
                levels.rms,
                levels.peak
            );
        }
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("capture error: {}", error);
    }

    fn on_recording_finished(&self, buffer: &AudioBuffer) {
        log::info!("captured {} frames", buffer.frame_count());
    }
}

fn load_config(cli: &Cli) -> Result<RecorderConfiguration, CaptureError> {
    let mut config = match cli.config {
        Some(ref path) => RecorderConfiguration::from_json_file(path)?,
        None => RecorderConfiguration::default(),
    };
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    config.validate().map_err(CaptureError::InvalidConfiguration)?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CaptureError> {
    let config = load_config(&cli)?;
    if !cli.loud_secs.is_finite() || cli.loud_secs < 0.0 {
        return Err(CaptureError::InvalidConfiguration(format!(
            "invalid --loud-secs: {}",
            cli.loud_secs
        )));
    }

    let block_frames = (config.sample_rate as f64 * config.block_duration).round().max(1.0) as usize;
    let source = SyntheticSource::tone_then_silence(
        config.sample_rate,
        config.channels,
        block_frames,
        config.blocks_for(cli.loud_secs),
        0.5,
    )
    .with_pacing(Duration::from_secs_f64(config.block_duration));

    let mut session = CaptureSession::new(source, config.clone())?;
    session.set_observer(Arc::new(LevelLogger {
        blocks: AtomicU64::new(0),
        every: config.blocks_for(1.0).max(1),
    }));
    log::info!("recording from {}", session.device_info().name);

    let buffer = match cli.command {
        Commands::Fixed { seconds } => session.record_audio(seconds)?,
        Commands::UntilSilence => session.record_until_silence()?,
    };

    let saved = session.save_recording(&buffer, &cli.output)?;
    println!("saved:    {}", saved.file_path.display());
    println!("duration: {:.2}s", saved.duration_secs);
    println!("sha256:   {}", saved.checksum);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
