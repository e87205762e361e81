use tokio::sync::broadcast;

use crate::domain::value_objects::{ConnectionId, ProducerEvent, ProducerId};

/// Fan-out of producer lifecycle events to every connected session
///
/// Owned by the `SessionRegistry`, which publishes under its lock.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<ProducerEvent>,
}

impl NotificationBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProducerEvent> {
        self.tx.subscribe()
    }

    pub fn publish_added(&self, producer_id: ProducerId, origin: Option<ConnectionId>) {
        self.publish(ProducerEvent::added(producer_id, origin));
    }

    pub fn publish_removed(&self, producer_id: ProducerId, origin: Option<ConnectionId>) {
        self.publish(ProducerEvent::removed(producer_id, origin));
    }

    fn publish(&self, event: ProducerEvent) {
        tracing::debug!(
            producer_id = %event.producer_id,
            event = event.kind.event_name(),
            "Broadcasting producer event"
        );
        // No subscribers is fine, nobody is connected yet.
        let _ = self.tx.send(event);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ProducerEventKind;

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = NotificationBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish_added(ProducerId::new("p-1"), None);

        for rx in [&mut a, &mut b] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.kind, ProducerEventKind::Added);
            assert_eq!(event.producer_id, ProducerId::new("p-1"));
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = NotificationBus::new(4);
        bus.publish_removed(ProducerId::new("p-1"), None);
        assert_eq!(bus.tx.receiver_count(), 0);
    }

    #[test]
    fn test_origin_filter() {
        let me = ConnectionId::new("me");
        let event = ProducerEvent::added(ProducerId::new("p"), Some(me.clone()));
        assert!(!event.is_for(&me));
        assert!(event.is_for(&ConnectionId::new("other")));
        assert!(ProducerEvent::removed(ProducerId::new("p"), None).is_for(&me));
    }
}
