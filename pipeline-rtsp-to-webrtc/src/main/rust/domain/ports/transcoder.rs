use async_trait::async_trait;

use crate::domain::errors::Result;
use crate::domain::value_objects::TranscodeJob;

/// Port for launching the external RTSP-to-RTP transcoder
#[async_trait]
pub trait TranscoderLauncher: Send + Sync {
    async fn launch(&self, job: &TranscodeJob) -> Result<Box<dyn TranscoderProcess>>;
}

/// A running transcoder process
#[async_trait]
pub trait TranscoderProcess: Send {
    fn pid(&self) -> Option<u32>;

    /// Wait for the process to exit; `None` when it was killed by a signal
    async fn wait(&mut self) -> Result<Option<i32>>;

    async fn kill(&mut self) -> Result<()>;
}
