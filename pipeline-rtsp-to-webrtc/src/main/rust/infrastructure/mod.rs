pub mod ffmpeg;
pub mod http;
pub mod metrics;
pub mod sfu;
pub mod signaling;
