pub mod level_meter;
pub mod silence_tracker;
pub mod wav_format;
