use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::domain::value_objects::{IngestSourceConfig, RestartPolicy};

/// SFU engine backing the signaling plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Signaling-only bookkeeping; hands out placeholder ICE/DTLS and moves no media
    InMemory,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pipeline-rtsp-to-webrtc",
    version = "0.1.0",
    author = "Hawkeye Video Pipeline",
    about = "RTSP to WebRTC SFU with supervised ffmpeg ingest (Pipeline 3)"
)]
pub struct Config {
    /// Signaling, health and metrics port
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Deployment environment reported on /health
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub environment: String,

    /// Local address for WebRTC and RTP sockets
    #[arg(long, env = "BIND_IP", default_value = "0.0.0.0")]
    pub bind_ip: IpAddr,

    /// SFU engine; there is no default, the binary refuses to start without one
    #[arg(long, env = "SFU_ENGINE", value_enum)]
    pub engine: Option<EngineKind>,

    /// Address advertised to clients in ICE candidates
    #[arg(long, env = "ANNOUNCED_IP", default_value = "127.0.0.1")]
    pub announced_ip: IpAddr,

    /// RTSP sources, comma separated; empty entries are ignored, so "" means none
    #[arg(
        long,
        env = "RTSP_URLS",
        value_delimiter = ',',
        default_value = "rtsp://pipeline-rtsp:8554/cam1"
    )]
    pub rtsp_urls: Vec<String>,

    /// RTP port of the first source; further sources take the following ports
    #[arg(long, env = "RTP_PORT_BASE", default_value = "10077")]
    pub rtp_port_base: u16,

    /// Transcoder binary
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg_path: PathBuf,

    /// Delay before relaunching an exited transcoder, in seconds
    #[arg(long, env = "RESTART_DELAY_SECS", default_value = "5")]
    pub restart_delay: u64,

    /// Growth factor of the restart delay (1.0 keeps it fixed)
    #[arg(long, env = "RESTART_MULTIPLIER", default_value = "1.0")]
    pub restart_multiplier: f64,

    /// Upper bound of the restart delay in seconds; defaults to the restart delay
    #[arg(long, env = "RESTART_MAX_DELAY_SECS")]
    pub restart_max_delay: Option<u64>,

    /// Give up on a source after this many restarts; unlimited when unset
    #[arg(long, env = "MAX_RESTARTS")]
    pub max_restarts: Option<u32>,

    /// Producer notifications buffered per connection before it lags
    #[arg(long, env = "NOTIFICATION_CAPACITY", default_value = "256")]
    pub notification_capacity: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        Self::validate_port(self.port, "signaling")?;
        Self::validate_port(self.rtp_port_base, "RTP base")?;

        if self.engine.is_none() {
            anyhow::bail!("No SFU engine selected; pass --engine (or SFU_ENGINE)");
        }

        let urls = self.source_urls();
        if let Some(url) = urls.iter().find(|url| !url.starts_with("rtsp://")) {
            anyhow::bail!("RTSP URL must start with rtsp://: {}", url);
        }

        let sources = urls.len() as u32;
        let last_port = self.rtp_port_base as u32 + sources.saturating_sub(1);
        if last_port > u16::MAX as u32 {
            anyhow::bail!(
                "{} sources starting at RTP port {} exceed the port range",
                sources,
                self.rtp_port_base
            );
        }
        if sources > 0 && (self.rtp_port_base as u32..=last_port).contains(&(self.port as u32)) {
            anyhow::bail!(
                "Signaling port {} collides with the RTP ports {}-{}",
                self.port,
                self.rtp_port_base,
                last_port
            );
        }

        if self.restart_delay == 0 {
            anyhow::bail!("Restart delay cannot be 0");
        }

        if !(self.restart_multiplier >= 1.0) {
            anyhow::bail!("Restart multiplier must be >= 1.0");
        }

        if let Some(max_delay) = self.restart_max_delay {
            if max_delay < self.restart_delay {
                anyhow::bail!(
                    "Maximum restart delay ({}) cannot be less than restart delay ({})",
                    max_delay,
                    self.restart_delay
                );
            }
        }

        if self.notification_capacity == 0 {
            anyhow::bail!("Notification capacity cannot be 0");
        }

        Ok(())
    }

    fn validate_port(port: u16, name: &str) -> anyhow::Result<()> {
        if port == 0 {
            anyhow::bail!("Invalid {} port: port cannot be 0", name);
        }
        if port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid {} port: {} is a privileged port (< {}). Use a port >= {}",
                name,
                port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }
        Ok(())
    }

    /// Configured RTSP URLs, trimmed, without empty entries
    pub fn source_urls(&self) -> Vec<String> {
        self.rtsp_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn to_ingest_sources(&self) -> crate::domain::errors::Result<Vec<IngestSourceConfig>> {
        IngestSourceConfig::assign_ports(&self.source_urls(), self.rtp_port_base)
    }

    pub fn to_restart_policy(&self) -> crate::domain::errors::Result<RestartPolicy> {
        let delay = Duration::from_secs(self.restart_delay);
        RestartPolicy::new(
            delay,
            self.restart_max_delay
                .map(Duration::from_secs)
                .unwrap_or(delay),
            self.restart_multiplier,
            self.max_restarts,
        )
    }
}
