use crate::domain::errors::{DomainError, Result};

/// Configuration for one RTSP ingest source
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSourceConfig {
    rtsp_url: String,
    rtp_port: u16,
}

impl IngestSourceConfig {
    pub fn new(rtsp_url: String, rtp_port: u16) -> Result<Self> {
        Self::validate_rtsp_url(&rtsp_url)?;
        if rtp_port == 0 {
            return Err(DomainError::InvalidPort);
        }

        Ok(Self { rtsp_url, rtp_port })
    }

    /// Assign ports `base, base + 1, ...` to the URLs in order.
    pub fn assign_ports(urls: &[String], base_port: u16) -> Result<Vec<Self>> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| {
                let port = u16::try_from(index)
                    .ok()
                    .and_then(|offset| base_port.checked_add(offset))
                    .ok_or(DomainError::InvalidPort)?;
                Self::new(url.clone(), port)
            })
            .collect()
    }

    pub fn rtsp_url(&self) -> &str {
        &self.rtsp_url
    }

    pub fn rtp_port(&self) -> u16 {
        self.rtp_port
    }

    /// RTSP URL with any `user:password@` part masked, for logs and status output
    pub fn redacted_url(&self) -> String {
        let Some(rest) = self.rtsp_url.strip_prefix("rtsp://") else {
            return self.rtsp_url.clone();
        };
        let authority_end = rest.find('/').unwrap_or(rest.len());
        match rest[..authority_end].rfind('@') {
            Some(at) => format!("rtsp://***@{}", &rest[at + 1..]),
            None => self.rtsp_url.clone(),
        }
    }

    fn validate_rtsp_url(url: &str) -> Result<()> {
        if !url.starts_with("rtsp://") || url.len() <= "rtsp://".len() {
            return Err(DomainError::InvalidRtspUrl(url.to_string()));
        }
        Ok(())
    }
}
