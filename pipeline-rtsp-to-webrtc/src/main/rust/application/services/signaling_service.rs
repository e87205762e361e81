use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::{CapabilityProvider, SessionRegistry};
use crate::domain::entities::DetachedTransport;
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{MetricsReporter, SfuEngine};
use crate::domain::value_objects::{
    ConnectionId, ConsumerParams, Direction, DtlsParameters, MediaKind, ProducerEvent, ProducerId,
    RtpCapabilities, RtpParameters, TransportId, TransportParams, WebRtcTransportOptions,
};

/// Application service implementing the per-connection negotiation handshake
///
/// Every operation either completes its registry update or leaves the registry
/// untouched; engine resources created for a session that vanished meanwhile
/// are released again before the `NotFound` is returned. Producer events are
/// published by the registry as part of each update.
pub struct SignalingService {
    engine: Arc<dyn SfuEngine>,
    capabilities: CapabilityProvider,
    registry: Arc<SessionRegistry>,
    metrics: Arc<dyn MetricsReporter>,
    transport_options: WebRtcTransportOptions,
}

impl SignalingService {
    pub fn new(
        engine: Arc<dyn SfuEngine>,
        registry: Arc<SessionRegistry>,
        metrics: Arc<dyn MetricsReporter>,
        transport_options: WebRtcTransportOptions,
    ) -> Self {
        let capabilities = CapabilityProvider::from_engine(engine.as_ref());
        Self {
            engine,
            capabilities,
            registry,
            metrics,
            transport_options,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Open a session for a new connection and subscribe it to producer events
    pub fn connect(&self, id: &ConnectionId) -> Result<broadcast::Receiver<ProducerEvent>> {
        // Subscribe first so nothing published right after `open` is missed.
        let events = self.registry.subscribe();
        self.registry.open(id.clone())?;
        self.metrics.report_session_opened();
        tracing::info!(connection_id = %id, "Session opened");
        Ok(events)
    }

    pub fn get_capabilities(&self) -> Arc<RtpCapabilities> {
        self.capabilities.shared()
    }

    pub async fn create_send_transport(&self, id: &ConnectionId) -> Result<TransportParams> {
        self.create_transport(id, Direction::Send).await
    }

    pub async fn create_recv_transport(&self, id: &ConnectionId) -> Result<TransportParams> {
        self.create_transport(id, Direction::Recv).await
    }

    async fn create_transport(
        &self,
        id: &ConnectionId,
        direction: Direction,
    ) -> Result<TransportParams> {
        self.registry.get(id)?;

        let params = self
            .engine
            .create_webrtc_transport(&self.transport_options)
            .await
            .map_err(|e| {
                tracing::error!(connection_id = %id, %direction, error = %e, "Failed to create transport");
                e
            })?;

        match self.registry.set_transport(id, direction, params.id.clone()) {
            Ok(displaced) => {
                if let Some(detached) = displaced {
                    tracing::debug!(
                        connection_id = %id,
                        transport_id = %detached.transport_id,
                        "Replacing previous transport"
                    );
                    self.release_detached(id, detached).await;
                }
                tracing::info!(connection_id = %id, %direction, transport_id = %params.id, "Transport created");
                Ok(params)
            }
            Err(e) => {
                self.engine.close_transport(&params.id).await;
                Err(e)
            }
        }
    }

    pub async fn connect_transport(
        &self,
        id: &ConnectionId,
        direction: Direction,
        dtls_parameters: DtlsParameters,
    ) -> Result<()> {
        let transport_id = self.registry.transport(id, direction)?;

        self.engine
            .connect_transport(&transport_id, dtls_parameters)
            .await
            .map_err(|e| {
                tracing::error!(connection_id = %id, %transport_id, error = %e, "Transport connect failed");
                e
            })?;

        self.registry.mark_connected(id, direction, &transport_id)?;
        tracing::debug!(connection_id = %id, %direction, %transport_id, "Transport connected");
        Ok(())
    }

    /// Publish a stream on the session's send transport.
    ///
    /// May be called repeatedly; every call creates one more producer.
    pub async fn produce(
        &self,
        id: &ConnectionId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId> {
        let transport_id = self.registry.connected_transport(id, Direction::Send)?;

        let producer_id = self
            .engine
            .produce(&transport_id, kind, rtp_parameters)
            .await
            .map_err(|e| {
                tracing::error!(connection_id = %id, %transport_id, error = %e, "Produce failed");
                e
            })?;

        if let Err(e) = self
            .registry
            .add_producer(id, &transport_id, producer_id.clone())
        {
            self.engine.close_producer(&producer_id).await;
            return Err(e);
        }

        self.report_live_producers();
        tracing::info!(connection_id = %id, %producer_id, %kind, "Producer added");
        Ok(producer_id)
    }

    pub async fn consume(
        &self,
        id: &ConnectionId,
        producer_id: &ProducerId,
        capabilities: &RtpCapabilities,
    ) -> Result<ConsumerParams> {
        let transport_id = self.registry.connected_transport(id, Direction::Recv)?;

        if !self.registry.is_live(producer_id) {
            return Err(DomainError::not_found(format!("producer {}", producer_id)));
        }

        if !self.engine.can_consume(producer_id, capabilities) {
            return Err(DomainError::Incompatible(producer_id.to_string()));
        }

        let params = self
            .engine
            .consume(&transport_id, producer_id, capabilities)
            .await
            .map_err(|e| {
                tracing::error!(connection_id = %id, %producer_id, error = %e, "Consume failed");
                e
            })?;

        // On failure the transport or the producer is already gone and took
        // the consumer with it.
        self.registry
            .add_consumer(id, &transport_id, params.id.clone(), producer_id)?;

        tracing::debug!(connection_id = %id, %producer_id, consumer_id = %params.id, "Consumer created");
        Ok(params)
    }

    pub fn list_producers(&self) -> Vec<ProducerId> {
        self.registry.live_producers()
    }

    /// Tear down a session; unknown ids are ignored.
    pub async fn disconnect(&self, id: &ConnectionId) {
        let Some(closed) = self.registry.close(id) else {
            tracing::debug!(connection_id = %id, "Disconnect for unknown session");
            return;
        };

        self.metrics.report_session_closed();
        self.report_live_producers();

        for transport_id in &closed.transports {
            self.engine.close_transport(transport_id).await;
        }

        tracing::info!(
            connection_id = %id,
            producers = closed.producers.len(),
            transports = closed.transports.len(),
            uptime_secs = closed.uptime.as_secs(),
            "Session closed"
        );
    }

    /// The engine closed a transport on its own (e.g. DTLS went away).
    pub async fn transport_closed(&self, transport_id: &TransportId) {
        let Some((owner, detached)) = self.registry.detach_transport(transport_id) else {
            return;
        };

        tracing::warn!(connection_id = %owner, %transport_id, "Transport closed by engine");
        self.release_detached(&owner, detached).await;
    }

    /// Follow the engine's own transport closures until shutdown.
    ///
    /// Subscribes before returning, so closures after this call are not missed.
    pub fn watch_engine_closures(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let mut closed = self.engine.closed_transports();
        let service = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = closed.recv() => match event {
                        Ok(transport_id) => service.transport_closed(&transport_id).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Missed engine transport closures");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => break,
                }
            }
            tracing::debug!("Engine closure watcher stopped");
        })
    }

    async fn release_detached(&self, owner: &ConnectionId, detached: DetachedTransport) {
        if !detached.producers.is_empty() {
            self.report_live_producers();
        }
        tracing::debug!(
            connection_id = %owner,
            transport_id = %detached.transport_id,
            producers = detached.producers.len(),
            "Releasing detached transport"
        );
        self.engine.close_transport(&detached.transport_id).await;
    }

    fn report_live_producers(&self) {
        self.metrics
            .report_live_producers(self.registry.live_producers().len());
    }
}
