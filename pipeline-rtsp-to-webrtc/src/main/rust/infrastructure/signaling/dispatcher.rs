use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use super::messages::{
    error_payload, events, ClientEnvelope, ConnectTransportRequest, ConsumeRequest,
    OutboundMessage, ProduceRequest, ServerNotification, ServerReply,
};
use crate::application::services::SignalingService;
use crate::domain::errors::DomainError;
use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::{ConnectionId, Direction};

/// Label used for requests whose event name is not part of the protocol
const UNKNOWN_EVENT_LABEL: &str = "unknown";

#[derive(Debug, Error)]
enum RequestError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RequestError {
    fn client_message(&self) -> String {
        match self {
            Self::Domain(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

type RequestResult = std::result::Result<Value, RequestError>;

/// Turns signaling frames into `SignalingService` calls and their replies
pub struct SignalingDispatcher {
    service: Arc<SignalingService>,
    metrics: Arc<dyn MetricsReporter>,
}

impl SignalingDispatcher {
    pub fn new(service: Arc<SignalingService>, metrics: Arc<dyn MetricsReporter>) -> Self {
        Self { service, metrics }
    }

    pub fn service(&self) -> &Arc<SignalingService> {
        &self.service
    }

    /// Handle one text frame.
    ///
    /// Requests carrying an id always get a reply. Requests without one only
    /// produce an `error` notification when they fail.
    pub async fn handle_text(&self, connection_id: &ConnectionId, text: &str) -> Option<OutboundMessage> {
        let envelope = match serde_json::from_str::<ClientEnvelope>(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(%connection_id, error = %e, "Malformed signaling frame");
                self.metrics.report_request(UNKNOWN_EVENT_LABEL, false);
                let error = RequestError::Malformed(e.to_string());
                return Some(match Self::salvage_id(text) {
                    Some(id) => OutboundMessage::Reply(ServerReply {
                        id,
                        data: error_payload(&error.client_message()),
                    }),
                    None => OutboundMessage::Notification(ServerNotification::request_failed(
                        UNKNOWN_EVENT_LABEL,
                        &error.client_message(),
                    )),
                });
            }
        };

        tracing::debug!(%connection_id, event = %envelope.event, id = ?envelope.id, "Signaling request");
        let result = self
            .dispatch(connection_id, &envelope.event, envelope.data)
            .await;

        let label = match &result {
            Err(RequestError::UnknownEvent(_)) => UNKNOWN_EVENT_LABEL,
            _ => envelope.event.as_str(),
        };
        self.metrics.report_request(label, result.is_ok());

        if let Err(e) = &result {
            tracing::warn!(%connection_id, event = %envelope.event, error = %e, "Signaling request failed");
        }

        match (envelope.id, result) {
            (Some(id), Ok(data)) => Some(OutboundMessage::Reply(ServerReply { id, data })),
            (Some(id), Err(e)) => Some(OutboundMessage::Reply(ServerReply {
                id,
                data: error_payload(&e.client_message()),
            })),
            (None, Ok(_)) => None,
            (None, Err(e)) => Some(OutboundMessage::Notification(
                ServerNotification::request_failed(&envelope.event, &e.client_message()),
            )),
        }
    }

    async fn dispatch(&self, connection_id: &ConnectionId, event: &str, data: Value) -> RequestResult {
        let service = &self.service;
        match event {
            events::GET_RTP_CAPABILITIES => to_value(service.get_capabilities().as_ref()),
            events::CREATE_SEND_TRANSPORT => {
                let params = service.create_send_transport(connection_id).await?;
                Ok(json!({ "params": params }))
            }
            events::CREATE_RECV_TRANSPORT => {
                let params = service.create_recv_transport(connection_id).await?;
                Ok(json!({ "params": params }))
            }
            events::CONNECT_SEND_TRANSPORT => {
                let request: ConnectTransportRequest = parse(data)?;
                service
                    .connect_transport(connection_id, Direction::Send, request.dtls_parameters)
                    .await?;
                Ok(json!({}))
            }
            events::CONNECT_RECV_TRANSPORT => {
                let request: ConnectTransportRequest = parse(data)?;
                service
                    .connect_transport(connection_id, Direction::Recv, request.dtls_parameters)
                    .await?;
                Ok(json!({}))
            }
            events::PRODUCE => {
                let request: ProduceRequest = parse(data)?;
                let id = service
                    .produce(connection_id, request.kind, request.rtp_parameters)
                    .await?;
                Ok(json!({ "id": id }))
            }
            events::CONSUME => {
                let request: ConsumeRequest = parse(data)?;
                let params = service
                    .consume(connection_id, &request.producer_id, &request.rtp_capabilities)
                    .await?;
                Ok(json!({ "params": params }))
            }
            events::GET_PRODUCERS => to_value(&service.list_producers()),
            other => Err(RequestError::UnknownEvent(other.to_string())),
        }
    }

    fn salvage_id(text: &str) -> Option<u64> {
        serde_json::from_str::<Value>(text)
            .ok()?
            .get("id")?
            .as_u64()
    }
}

fn parse<T: DeserializeOwned>(data: Value) -> std::result::Result<T, RequestError> {
    serde_json::from_value(data).map_err(|e| RequestError::Malformed(e.to_string()))
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> RequestResult {
    serde_json::to_value(value).map_err(|e| RequestError::Malformed(e.to_string()))
}
