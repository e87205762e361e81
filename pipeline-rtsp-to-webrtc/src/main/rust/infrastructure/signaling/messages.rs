use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::value_objects::{
    DtlsParameters, MediaKind, ProducerEvent, ProducerId, RtpCapabilities, RtpParameters,
};

/// Event names used on the signaling socket
pub mod events {
    pub const GET_RTP_CAPABILITIES: &str = "getRtpCapabilities";
    pub const CREATE_SEND_TRANSPORT: &str = "createSendTransport";
    pub const CONNECT_SEND_TRANSPORT: &str = "transport-connect";
    pub const PRODUCE: &str = "transport-produce";
    pub const CREATE_RECV_TRANSPORT: &str = "createRecvTransport";
    pub const CONNECT_RECV_TRANSPORT: &str = "transport-recv-connect";
    pub const CONSUME: &str = "consume";
    pub const GET_PRODUCERS: &str = "getProducers";
    pub const ERROR: &str = "error";
}

/// Client request frame: `{"id": 7, "event": "consume", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default)]
    pub id: Option<u64>,
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectTransportRequest {
    pub dtls_parameters: DtlsParameters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceRequest {
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub producer_id: ProducerId,
    pub rtp_capabilities: RtpCapabilities,
}

/// Reply to one request, correlated by the request id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerReply {
    pub id: u64,
    pub data: Value,
}

/// Unsolicited server push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerNotification {
    pub event: String,
    pub data: Value,
}

impl ServerNotification {
    pub fn producer(event: &ProducerEvent) -> Self {
        Self {
            event: event.kind.event_name().to_string(),
            data: json!({ "id": event.producer_id }),
        }
    }

    /// Failure of a request that carried no id
    pub fn request_failed(request_event: &str, message: &str) -> Self {
        Self {
            event: events::ERROR.to_string(),
            data: json!({ "event": request_event, "error": message }),
        }
    }
}

/// Anything written to the socket
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Reply(ServerReply),
    Notification(ServerNotification),
}

impl OutboundMessage {
    pub fn to_text(&self) -> serde_json::Result<String> {
        match self {
            Self::Reply(reply) => serde_json::to_string(reply),
            Self::Notification(notification) => serde_json::to_string(notification),
        }
    }
}

pub fn error_payload(message: &str) -> Value {
    json!({ "error": message })
}
