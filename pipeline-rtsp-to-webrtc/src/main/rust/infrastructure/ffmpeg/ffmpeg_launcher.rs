use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use super::FfmpegArgs;
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{TranscoderLauncher, TranscoderProcess};
use crate::domain::value_objects::TranscodeJob;

/// Launches ffmpeg as a child process per transcode job
pub struct FfmpegLauncher {
    binary: PathBuf,
}

impl FfmpegLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn forward_output<R>(stream: R, port: u16, name: &'static str)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(rtp_port = port, stream = name, "ffmpeg: {}", line);
            }
        });
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl TranscoderLauncher for FfmpegLauncher {
    async fn launch(&self, job: &TranscodeJob) -> Result<Box<dyn TranscoderProcess>> {
        let args = FfmpegArgs::build(job);
        tracing::debug!(
            "Launching transcoder: {} {}",
            self.binary.display(),
            args.join(" ").replace(&job.rtsp_url, "<rtsp-url>")
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::ProcessFailure(format!(
                    "failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if let Some(stdout) = child.stdout.take() {
            Self::forward_output(stdout, job.rtp_port, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            Self::forward_output(stderr, job.rtp_port, "stderr");
        }

        Ok(Box::new(FfmpegProcess { child }))
    }
}

pub struct FfmpegProcess {
    child: Child,
}

#[async_trait]
impl TranscoderProcess for FfmpegProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<Option<i32>> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| DomainError::ProcessFailure(format!("wait failed: {}", e)))?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| DomainError::ProcessFailure(format!("kill failed: {}", e)))
    }
}
