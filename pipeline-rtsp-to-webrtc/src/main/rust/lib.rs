pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{
    CapabilityProvider, IngestSettings, IngestStatus, IngestSupervisor, IngestTransition,
    NotificationBus, SessionRegistry, SignalingService,
};
pub use config::{Config, EngineKind};
pub use domain::entities::{IngestLifecycle, Session, StateTransition};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{MetricsReporter, SfuEngine, TranscoderLauncher, TranscoderProcess};
pub use domain::value_objects::{
    ConnectionId, IngestProfile, IngestSourceConfig, IngestState, ProducerEvent, ProducerId,
    RestartPolicy, RtpCodecCapability, TransportId, WebRtcTransportOptions,
};
pub use infrastructure::ffmpeg::{FfmpegArgs, FfmpegLauncher};
pub use infrastructure::http::{serve, HttpState};
pub use infrastructure::metrics::PrometheusReporter;
pub use infrastructure::sfu::InMemorySfuEngine;
pub use infrastructure::signaling::SignalingDispatcher;
