mod ingest_lifecycle;
mod session;

pub use ingest_lifecycle::{IngestLifecycle, StateTransition, MAX_HISTORY};
pub use session::{ClosedSession, DetachedTransport, Session, TrackState, TransportSlot, TransportState};
