use std::net::IpAddr;

use super::rtp::{
    default_video_feedback, h264_parameters, MediaKind, RtpCodecParameters,
    RtpEncodingParameters, RtpParameters,
};

/// Fixed RTP profile shared by the transcoder and the producer it feeds.
///
/// Payload type and SSRC must not change between restarts of a source, the
/// producer created at startup keeps expecting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProfile {
    payload_type: u8,
    ssrc: u32,
}

impl IngestProfile {
    pub const DEFAULT_PAYLOAD_TYPE: u8 = 101;
    pub const DEFAULT_SSRC: u32 = 1111;

    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        Self { payload_type, ssrc }
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    pub fn producer_rtp_parameters(&self) -> RtpParameters {
        RtpParameters {
            mid: None,
            codecs: vec![RtpCodecParameters {
                mime_type: "video/H264".to_string(),
                payload_type: self.payload_type,
                clock_rate: 90000,
                channels: None,
                parameters: h264_parameters(),
                rtcp_feedback: default_video_feedback(),
            }],
            header_extensions: Vec::new(),
            encodings: vec![RtpEncodingParameters {
                ssrc: Some(self.ssrc),
                ..Default::default()
            }],
            rtcp: None,
        }
    }

    pub fn job(&self, rtsp_url: &str, rtp_ip: IpAddr, rtp_port: u16) -> TranscodeJob {
        TranscodeJob {
            rtsp_url: rtsp_url.to_string(),
            rtp_ip,
            rtp_port,
            payload_type: self.payload_type,
            ssrc: self.ssrc,
        }
    }
}

impl Default for IngestProfile {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAYLOAD_TYPE, Self::DEFAULT_SSRC)
    }
}

/// One transcoder run: pull `rtsp_url`, push RTP to `rtp_ip:rtp_port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub rtsp_url: String,
    pub rtp_ip: IpAddr,
    pub rtp_port: u16,
    pub payload_type: u8,
    pub ssrc: u32,
}

impl TranscodeJob {
    pub fn rtp_url(&self) -> String {
        format!("rtp://{}:{}", self.rtp_ip, self.rtp_port)
    }
}
