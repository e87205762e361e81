use super::ids::{ConnectionId, ProducerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerEventKind {
    Added,
    Removed,
}

impl ProducerEventKind {
    /// Notification name on the signaling wire
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Added => "producerAdded",
            Self::Removed => "producerRemoved",
        }
    }
}

/// Producer lifecycle notification fanned out to every session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerEvent {
    pub kind: ProducerEventKind,
    pub producer_id: ProducerId,
    /// Connection that caused the event; `None` for ingest producers
    pub origin: Option<ConnectionId>,
}

impl ProducerEvent {
    pub fn added(producer_id: ProducerId, origin: Option<ConnectionId>) -> Self {
        Self {
            kind: ProducerEventKind::Added,
            producer_id,
            origin,
        }
    }

    pub fn removed(producer_id: ProducerId, origin: Option<ConnectionId>) -> Self {
        Self {
            kind: ProducerEventKind::Removed,
            producer_id,
            origin,
        }
    }

    /// Whether a session should be told about this event
    pub fn is_for(&self, connection_id: &ConnectionId) -> bool {
        self.origin.as_ref() != Some(connection_id)
    }
}
