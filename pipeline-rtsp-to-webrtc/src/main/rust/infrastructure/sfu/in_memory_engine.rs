use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::SfuEngine;
use crate::domain::value_objects::{
    ConsumerId, ConsumerParams, DtlsFingerprint, DtlsParameters, IceCandidate, IceParameters,
    MediaKind, PlainTransportInfo, PlainTransportOptions, ProducerId, RtpCapabilities,
    RtpCodecCapability, RtpCodecParameters, RtpEncodingParameters, RtpParameters, TransportId,
    TransportParams, WebRtcTransportOptions,
};

/// First payload type handed out to router codecs without a preference
const FIRST_DYNAMIC_PAYLOAD_TYPE: u8 = 96;
const FIRST_WEBRTC_PORT: u16 = 40000;
const FIRST_CONSUMER_SSRC: u32 = 100_000_000;
const CLOSED_TRANSPORTS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportKind {
    WebRtc,
    Plain,
}

#[derive(Debug)]
struct TransportRecord {
    kind: TransportKind,
    connected: bool,
    port: u16,
    // Never reused on this transport, even after consumers close
    next_mid: u32,
}

impl TransportRecord {
    fn new(kind: TransportKind, connected: bool, port: u16) -> Self {
        Self {
            kind,
            connected,
            port,
            next_mid: 0,
        }
    }
}

#[derive(Debug)]
struct ProducerRecord {
    transport_id: TransportId,
    kind: MediaKind,
    rtp_parameters: RtpParameters,
}

#[derive(Debug)]
struct ConsumerRecord {
    transport_id: TransportId,
    producer_id: ProducerId,
}

#[derive(Debug)]
struct EngineState {
    transports: HashMap<TransportId, TransportRecord>,
    producers: HashMap<ProducerId, ProducerRecord>,
    consumers: HashMap<ConsumerId, ConsumerRecord>,
    next_port: u16,
    next_ssrc: u32,
}

impl EngineState {
    fn remove_producer(&mut self, producer_id: &ProducerId) -> bool {
        if self.producers.remove(producer_id).is_none() {
            return false;
        }
        self.consumers.retain(|_, c| c.producer_id != *producer_id);
        true
    }

    /// Drop a transport with its producers, their consumers and its own consumers.
    fn remove_transport(&mut self, transport_id: &TransportId) -> bool {
        if self.transports.remove(transport_id).is_none() {
            return false;
        }
        let producers: Vec<ProducerId> = self
            .producers
            .iter()
            .filter(|(_, p)| p.transport_id == *transport_id)
            .map(|(id, _)| id.clone())
            .collect();
        for producer_id in &producers {
            self.remove_producer(producer_id);
        }
        self.consumers.retain(|_, c| c.transport_id != *transport_id);
        true
    }
}

/// Signaling-only SFU engine kept entirely in memory
///
/// It performs the bookkeeping and negotiation checks of a router (codec
/// support, DTLS connect-once, consume compatibility) but moves no media:
/// the ICE candidates and DTLS fingerprint it hands out are placeholders no
/// browser can complete a handshake against. It backs tests and signaling
/// development only and is never picked unless asked for (`--engine in-memory`).
/// A media-plane engine plugs in through the same `SfuEngine` port.
pub struct InMemorySfuEngine {
    capabilities: RtpCapabilities,
    state: Mutex<EngineState>,
    closed_transports: broadcast::Sender<TransportId>,
}

impl InMemorySfuEngine {
    pub fn new(media_codecs: Vec<RtpCodecCapability>) -> Result<Self> {
        if media_codecs.is_empty() {
            return Err(DomainError::engine("router needs at least one media codec"));
        }

        let mut next_payload_type = FIRST_DYNAMIC_PAYLOAD_TYPE;
        let codecs = media_codecs
            .into_iter()
            .map(|mut codec| {
                if codec.preferred_payload_type.is_none() {
                    codec.preferred_payload_type = Some(next_payload_type);
                    next_payload_type += 1;
                }
                codec
            })
            .collect();

        Ok(Self {
            capabilities: RtpCapabilities {
                codecs,
                header_extensions: Vec::new(),
            },
            state: Mutex::new(EngineState {
                transports: HashMap::new(),
                producers: HashMap::new(),
                consumers: HashMap::new(),
                next_port: FIRST_WEBRTC_PORT,
                next_ssrc: FIRST_CONSUMER_SSRC,
            }),
            closed_transports: broadcast::channel(CLOSED_TRANSPORTS_CAPACITY).0,
        })
    }

    /// Close a transport from inside the engine, the way a DTLS failure
    /// would, and report it on `closed_transports`.
    pub fn expire_transport(&self, transport_id: &TransportId) -> bool {
        if !self.state().remove_transport(transport_id) {
            return false;
        }
        tracing::debug!(%transport_id, "Transport expired inside engine");
        let _ = self.closed_transports.send(transport_id.clone());
        true
    }

    pub fn transport_count(&self) -> usize {
        self.state().transports.len()
    }

    pub fn producer_count(&self) -> usize {
        self.state().producers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.state().consumers.len()
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn router_supports(&self, codec: &RtpCodecParameters) -> bool {
        self.capabilities
            .find(&codec.mime_type, codec.clock_rate)
            .is_some()
    }

    fn random_token() -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn fingerprint() -> String {
        let bytes: Vec<u8> = [Uuid::new_v4(), Uuid::new_v4()]
            .iter()
            .flat_map(|id| id.as_bytes().to_vec())
            .collect();
        bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    fn candidates(options: &WebRtcTransportOptions, port: u16) -> Vec<IceCandidate> {
        let ip: IpAddr = options.announced_ip.unwrap_or(options.listen_ip);
        let mut candidates = Vec::new();
        let (udp_priority, tcp_priority) = if options.prefer_udp {
            (1_076_302_079, 1_076_276_479)
        } else {
            (1_076_276_479, 1_076_302_079)
        };

        if options.enable_udp {
            candidates.push(IceCandidate {
                foundation: "udpcandidate".to_string(),
                priority: udp_priority,
                ip: ip.to_string(),
                protocol: "udp".to_string(),
                port,
                candidate_type: "host".to_string(),
            });
        }
        if options.enable_tcp {
            candidates.push(IceCandidate {
                foundation: "tcpcandidate".to_string(),
                priority: tcp_priority,
                ip: ip.to_string(),
                protocol: "tcp".to_string(),
                port,
                candidate_type: "host".to_string(),
            });
        }
        candidates
    }
}

#[async_trait]
impl SfuEngine for InMemorySfuEngine {
    fn rtp_capabilities(&self) -> RtpCapabilities {
        self.capabilities.clone()
    }

    async fn create_webrtc_transport(
        &self,
        options: &WebRtcTransportOptions,
    ) -> Result<TransportParams> {
        if !options.enable_udp && !options.enable_tcp {
            return Err(DomainError::engine("transport needs UDP or TCP enabled"));
        }

        let id = TransportId::generate();
        let mut state = self.state();
        let port = state.next_port;
        state.next_port = state.next_port.checked_add(1).unwrap_or(FIRST_WEBRTC_PORT);
        state
            .transports
            .insert(id.clone(), TransportRecord::new(TransportKind::WebRtc, false, port));

        Ok(TransportParams {
            id,
            ice_parameters: IceParameters {
                username_fragment: Self::random_token(),
                password: Self::random_token(),
                ice_lite: true,
            },
            ice_candidates: Self::candidates(options, port),
            dtls_parameters: DtlsParameters {
                role: Some("auto".to_string()),
                fingerprints: vec![DtlsFingerprint {
                    algorithm: "sha-256".to_string(),
                    value: Self::fingerprint(),
                }],
            },
        })
    }

    async fn connect_transport(
        &self,
        transport_id: &TransportId,
        dtls_parameters: DtlsParameters,
    ) -> Result<()> {
        if dtls_parameters.fingerprints.is_empty() {
            return Err(DomainError::engine("DTLS parameters carry no fingerprint"));
        }

        let mut state = self.state();
        let transport = state
            .transports
            .get_mut(transport_id)
            .ok_or_else(|| DomainError::engine(format!("transport {} not found", transport_id)))?;

        if transport.kind != TransportKind::WebRtc {
            return Err(DomainError::engine("plain transports are connected by comedia"));
        }
        if transport.connected {
            return Err(DomainError::engine(format!(
                "transport {} already connected",
                transport_id
            )));
        }
        transport.connected = true;
        Ok(())
    }

    async fn produce(
        &self,
        transport_id: &TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId> {
        if rtp_parameters.codecs.is_empty() {
            return Err(DomainError::engine("rtpParameters has no codecs"));
        }
        if let Some(codec) = rtp_parameters.codecs.iter().find(|c| !self.router_supports(c)) {
            return Err(DomainError::engine(format!(
                "codec {}/{} not supported by router",
                codec.mime_type, codec.clock_rate
            )));
        }

        let mut state = self.state();
        if !state.transports.contains_key(transport_id) {
            return Err(DomainError::engine(format!("transport {} not found", transport_id)));
        }

        let id = ProducerId::generate();
        state.producers.insert(
            id.clone(),
            ProducerRecord {
                transport_id: transport_id.clone(),
                kind,
                rtp_parameters,
            },
        );
        Ok(id)
    }

    fn can_consume(&self, producer_id: &ProducerId, capabilities: &RtpCapabilities) -> bool {
        let state = self.state();
        let Some(producer) = state.producers.get(producer_id) else {
            return false;
        };
        producer
            .rtp_parameters
            .codecs
            .iter()
            .any(|codec| capabilities.find(&codec.mime_type, codec.clock_rate).is_some())
    }

    async fn consume(
        &self,
        transport_id: &TransportId,
        producer_id: &ProducerId,
        capabilities: &RtpCapabilities,
    ) -> Result<ConsumerParams> {
        let mut state = self.state();
        let state = &mut *state;

        match state.transports.get(transport_id) {
            Some(t) if t.kind == TransportKind::WebRtc => {}
            Some(_) => return Err(DomainError::engine("cannot consume on a plain transport")),
            None => {
                return Err(DomainError::engine(format!("transport {} not found", transport_id)))
            }
        }

        let producer = state
            .producers
            .get(producer_id)
            .ok_or_else(|| DomainError::engine(format!("producer {} not found", producer_id)))?;

        let codecs: Vec<RtpCodecParameters> = producer
            .rtp_parameters
            .codecs
            .iter()
            .filter_map(|codec| {
                let wanted = capabilities.find(&codec.mime_type, codec.clock_rate)?;
                let mut codec = codec.clone();
                if let Some(pt) = wanted.preferred_payload_type {
                    codec.payload_type = pt;
                }
                Some(codec)
            })
            .collect();

        if codecs.is_empty() {
            return Err(DomainError::engine("no codec in common with consumer"));
        }

        let kind = producer.kind;
        let ssrc = state.next_ssrc;
        state.next_ssrc = state.next_ssrc.wrapping_add(1);
        let mid = match state.transports.get_mut(transport_id) {
            Some(transport) => {
                let mid = transport.next_mid;
                transport.next_mid += 1;
                mid.to_string()
            }
            None => return Err(DomainError::engine(format!("transport {} not found", transport_id))),
        };

        let id = ConsumerId::generate();
        state.consumers.insert(
            id.clone(),
            ConsumerRecord {
                transport_id: transport_id.clone(),
                producer_id: producer_id.clone(),
            },
        );

        Ok(ConsumerParams {
            id,
            producer_id: producer_id.clone(),
            kind,
            rtp_parameters: RtpParameters {
                mid: Some(mid),
                codecs,
                header_extensions: Vec::new(),
                encodings: vec![RtpEncodingParameters {
                    ssrc: Some(ssrc),
                    ..Default::default()
                }],
                rtcp: None,
            },
        })
    }

    async fn create_plain_transport(
        &self,
        options: &PlainTransportOptions,
    ) -> Result<PlainTransportInfo> {
        if options.port == 0 {
            return Err(DomainError::engine("plain transport needs a fixed port"));
        }

        let mut state = self.state();
        if state.transports.values().any(|t| t.port == options.port) {
            return Err(DomainError::engine(format!("port {} already in use", options.port)));
        }

        let id = TransportId::generate();
        state.transports.insert(
            id.clone(),
            TransportRecord::new(TransportKind::Plain, options.comedia, options.port),
        );

        Ok(PlainTransportInfo {
            id,
            ip: options.announced_ip.unwrap_or(options.listen_ip),
            port: options.port,
        })
    }

    async fn close_transport(&self, transport_id: &TransportId) {
        self.state().remove_transport(transport_id);
    }

    async fn close_producer(&self, producer_id: &ProducerId) {
        self.state().remove_producer(producer_id);
    }

    fn closed_transports(&self) -> broadcast::Receiver<TransportId> {
        self.closed_transports.subscribe()
    }
}
