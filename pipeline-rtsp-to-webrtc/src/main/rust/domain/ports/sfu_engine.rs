use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::errors::Result;
use crate::domain::value_objects::{
    ConsumerParams, DtlsParameters, MediaKind, PlainTransportInfo, PlainTransportOptions,
    ProducerId, RtpCapabilities, RtpParameters, TransportId, TransportParams,
    WebRtcTransportOptions,
};

/// Port for the SFU engine that owns routers, transports, producers and consumers
///
/// The control plane trusts the results it gets back; failures surface as
/// `DomainError::Engine`. Transports can also die inside the engine (DTLS
/// closed, ICE timed out); those are reported on `closed_transports`.
#[async_trait]
pub trait SfuEngine: Send + Sync {
    /// Router capabilities negotiated from the configured media codecs
    fn rtp_capabilities(&self) -> RtpCapabilities;

    async fn create_webrtc_transport(
        &self,
        options: &WebRtcTransportOptions,
    ) -> Result<TransportParams>;

    async fn connect_transport(
        &self,
        transport_id: &TransportId,
        dtls_parameters: DtlsParameters,
    ) -> Result<()>;

    async fn produce(
        &self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId>;

    /// Whether a consumer with `capabilities` can receive the producer
    fn can_consume(&self, producer_id: &ProducerId, capabilities: &RtpCapabilities) -> bool;

    async fn consume(
        &self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        capabilities: &RtpCapabilities,
    ) -> Result<ConsumerParams>;

    /// Plain RTP transport for an external sender (no ICE/DTLS)
    async fn create_plain_transport(
        &self,
        options: &PlainTransportOptions,
    ) -> Result<PlainTransportInfo>;

    /// Close a transport together with its producers and consumers
    async fn close_transport(&self, transport_id: &TransportId);

    /// Close a producer together with the consumers it feeds
    async fn close_producer(&self, producer_id: &ProducerId);

    /// Ids of transports the engine closed on its own, from now on.
    /// Closures requested through `close_transport` are not reported.
    fn closed_transports(&self) -> broadcast::Receiver<TransportId>;
}
