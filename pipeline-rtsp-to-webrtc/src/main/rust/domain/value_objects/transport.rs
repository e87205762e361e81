use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::ids::{ConsumerId, ProducerId, TransportId};
use super::rtp::{MediaKind, RtpParameters};

/// Which half of a session a transport serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Send,
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Recv => write!(f, "recv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceParameters {
    pub username_fragment: String,
    pub password: String,
    #[serde(default)]
    pub ice_lite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub foundation: String,
    pub priority: u32,
    pub ip: String,
    pub protocol: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub candidate_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub fingerprints: Vec<DtlsFingerprint>,
}

/// What a client needs to set up its side of a WebRTC transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportParams {
    pub id: TransportId,
    pub ice_parameters: IceParameters,
    pub ice_candidates: Vec<IceCandidate>,
    pub dtls_parameters: DtlsParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerParams {
    pub id: ConsumerId,
    pub producer_id: ProducerId,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebRtcTransportOptions {
    pub listen_ip: IpAddr,
    pub announced_ip: Option<IpAddr>,
    pub enable_udp: bool,
    pub enable_tcp: bool,
    pub prefer_udp: bool,
}

impl WebRtcTransportOptions {
    pub fn new(listen_ip: IpAddr, announced_ip: Option<IpAddr>) -> Self {
        Self {
            listen_ip,
            announced_ip,
            enable_udp: true,
            enable_tcp: true,
            prefer_udp: true,
        }
    }
}

/// Options for the non-ICE transport an ingest transcoder pushes RTP into
#[derive(Debug, Clone, PartialEq)]
pub struct PlainTransportOptions {
    pub listen_ip: IpAddr,
    pub announced_ip: Option<IpAddr>,
    pub port: u16,
    pub rtcp_mux: bool,
    pub comedia: bool,
}

impl PlainTransportOptions {
    pub fn new(listen_ip: IpAddr, announced_ip: Option<IpAddr>, port: u16) -> Self {
        Self {
            listen_ip,
            announced_ip,
            port,
            rtcp_mux: true,
            comedia: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlainTransportInfo {
    pub id: TransportId,
    pub ip: IpAddr,
    pub port: u16,
}
