mod metrics_reporter;
mod sfu_engine;
mod transcoder;

pub use metrics_reporter::MetricsReporter;
pub use sfu_engine::SfuEngine;
pub use transcoder::{TranscoderLauncher, TranscoderProcess};
