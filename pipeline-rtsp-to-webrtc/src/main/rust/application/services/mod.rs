mod capability_provider;
mod ingest_supervisor;
mod notification_bus;
mod session_registry;
mod signaling_service;

pub use capability_provider::CapabilityProvider;
pub use ingest_supervisor::{IngestSettings, IngestStatus, IngestSupervisor, IngestTransition};
pub use notification_bus::NotificationBus;
pub use session_registry::SessionRegistry;
pub use signaling_service::SignalingService;
