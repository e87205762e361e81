mod ffmpeg_args;
mod ffmpeg_launcher;

pub use ffmpeg_args::FfmpegArgs;
pub use ffmpeg_launcher::{FfmpegLauncher, FfmpegProcess};
