mod ids;
mod ingest_profile;
mod ingest_source_config;
mod ingest_state;
mod producer_event;
mod restart_policy;
mod rtp;
mod transport;

pub use ids::{ConnectionId, ConsumerId, ProducerId, TransportId};
pub use ingest_profile::{IngestProfile, TranscodeJob};
pub use ingest_source_config::IngestSourceConfig;
pub use ingest_state::IngestState;
pub use producer_event::{ProducerEvent, ProducerEventKind};
pub use restart_policy::RestartPolicy;
pub use rtp::{
    CodecParameters, MediaKind, RtcpFeedback, RtpCapabilities, RtpCodecCapability,
    RtpCodecParameters, RtpEncodingParameters, RtpParameters,
};
pub use transport::{
    ConsumerParams, Direction, DtlsFingerprint, DtlsParameters, IceCandidate, IceParameters,
    PlainTransportInfo, PlainTransportOptions, TransportParams, WebRtcTransportOptions,
};
