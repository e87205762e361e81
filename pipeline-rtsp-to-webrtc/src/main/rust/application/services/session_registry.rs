use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use super::NotificationBus;
use crate::domain::entities::{ClosedSession, DetachedTransport, Session};
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{
    ConnectionId, ConsumerId, Direction, ProducerEvent, ProducerId, TransportId,
};

/// What keeps a live producer alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProducerOwner {
    Session,
    Ingest,
}

#[derive(Debug, Clone)]
struct LiveProducer {
    id: ProducerId,
    owner: ProducerOwner,
}

#[derive(Debug, Default)]
struct RegistryState {
    sessions: HashMap<ConnectionId, Session>,
    // Insertion order is the order `live_producers` reports.
    live: Vec<LiveProducer>,
}

impl RegistryState {
    fn session_mut(&mut self, id: &ConnectionId) -> Result<&mut Session> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("session {}", id)))
    }

    /// Take producers out of the live set along with every consumer fed by them.
    fn drop_live(&mut self, producers: &[ProducerId]) {
        if producers.is_empty() {
            return;
        }
        self.live.retain(|p| !producers.contains(&p.id));
        for session in self.sessions.values_mut() {
            session.drop_consumers_of(producers);
        }
    }
}

/// In-memory sessions and the live-producer set
///
/// Both live behind one mutex, so a producer never shows up in the live set
/// without its owner and vice versa. Producer events are broadcast while that
/// mutex is held, which keeps every subscriber's view in the same order as the
/// live set. The lock is never held across `.await`.
#[derive(Debug)]
pub struct SessionRegistry {
    inner: Mutex<RegistryState>,
    bus: NotificationBus,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_bus(NotificationBus::default())
    }

    pub fn with_bus(bus: NotificationBus) -> Self {
        Self {
            inner: Mutex::new(RegistryState::default()),
            bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Producer events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ProducerEvent> {
        self.bus.subscribe()
    }

    fn announce_removed(&self, producers: &[ProducerId], origin: Option<&ConnectionId>) {
        for producer_id in producers {
            self.bus.publish_removed(producer_id.clone(), origin.cloned());
        }
    }

    pub fn open(&self, id: ConnectionId) -> Result<()> {
        let mut state = self.lock();
        if state.sessions.contains_key(&id) {
            return Err(DomainError::AlreadyExists(id.to_string()));
        }
        state.sessions.insert(id.clone(), Session::new(id));
        Ok(())
    }

    /// Snapshot of a session
    pub fn get(&self, id: &ConnectionId) -> Result<Session> {
        let state = self.lock();
        state
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("session {}", id)))
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.lock().sessions.contains_key(id)
    }

    pub fn set_send_transport(
        &self,
        id: &ConnectionId,
        transport_id: TransportId,
    ) -> Result<Option<DetachedTransport>> {
        self.set_transport(id, Direction::Send, transport_id)
    }

    pub fn set_recv_transport(
        &self,
        id: &ConnectionId,
        transport_id: TransportId,
    ) -> Result<Option<DetachedTransport>> {
        self.set_transport(id, Direction::Recv, transport_id)
    }

    /// Attach a transport; a displaced one comes back with its producers
    /// already removed from the live set and announced as removed.
    pub fn set_transport(
        &self,
        id: &ConnectionId,
        direction: Direction,
        transport_id: TransportId,
    ) -> Result<Option<DetachedTransport>> {
        let mut state = self.lock();
        let displaced = state.session_mut(id)?.attach_transport(direction, transport_id);
        if let Some(detached) = &displaced {
            state.drop_live(&detached.producers);
            self.announce_removed(&detached.producers, Some(id));
        }
        Ok(displaced)
    }

    /// Transport of a given direction, failing `NotFound` when absent
    pub fn transport(&self, id: &ConnectionId, direction: Direction) -> Result<TransportId> {
        self.get(id)?
            .transport(direction)
            .map(|slot| slot.id().clone())
            .ok_or_else(|| DomainError::not_found(format!("{} transport", direction)))
    }

    /// Transport of a given direction that has completed `connect`
    pub fn connected_transport(
        &self,
        id: &ConnectionId,
        direction: Direction,
    ) -> Result<TransportId> {
        let session = self.get(id)?;
        match session.transport(direction) {
            Some(slot) if slot.is_connected() => Ok(slot.id().clone()),
            Some(_) => Err(DomainError::not_found(format!(
                "connected {} transport",
                direction
            ))),
            None => Err(DomainError::not_found(format!("{} transport", direction))),
        }
    }

    /// Mark the transport connected, provided it is still the session's current one.
    pub fn mark_connected(
        &self,
        id: &ConnectionId,
        direction: Direction,
        transport_id: &TransportId,
    ) -> Result<()> {
        let mut state = self.lock();
        let session = state.session_mut(id)?;
        if session.transport(direction).map(|slot| slot.id()) != Some(transport_id) {
            return Err(DomainError::not_found(format!("{} transport", direction)));
        }
        session.mark_connected(direction);
        Ok(())
    }

    /// Record a producer on its session and in the live set, and announce it,
    /// in one step.
    pub fn add_producer(
        &self,
        id: &ConnectionId,
        transport_id: &TransportId,
        producer_id: ProducerId,
    ) -> Result<()> {
        let mut state = self.lock();
        let session = state.session_mut(id)?;
        if session.transport(Direction::Send).map(|slot| slot.id()) != Some(transport_id) {
            return Err(DomainError::not_found("send transport"));
        }
        session.add_producer(producer_id.clone());
        state.live.push(LiveProducer {
            id: producer_id.clone(),
            owner: ProducerOwner::Session,
        });
        self.bus.publish_added(producer_id, Some(id.clone()));
        Ok(())
    }

    /// Record a consumer, provided its producer is still live.
    pub fn add_consumer(
        &self,
        id: &ConnectionId,
        transport_id: &TransportId,
        consumer_id: ConsumerId,
        producer_id: &ProducerId,
    ) -> Result<()> {
        let mut state = self.lock();
        if !state.live.iter().any(|p| p.id == *producer_id) {
            return Err(DomainError::not_found(format!("producer {}", producer_id)));
        }
        let session = state.session_mut(id)?;
        if session.transport(Direction::Recv).map(|slot| slot.id()) != Some(transport_id) {
            return Err(DomainError::not_found("recv transport"));
        }
        session.add_consumer(consumer_id, producer_id.clone());
        Ok(())
    }

    pub fn add_ingest_producer(&self, producer_id: ProducerId, rtp_port: u16) {
        let mut state = self.lock();
        state.live.push(LiveProducer {
            id: producer_id.clone(),
            owner: ProducerOwner::Ingest,
        });
        tracing::debug!(%producer_id, rtp_port, "Ingest producer registered");
        self.bus.publish_added(producer_id, None);
    }

    /// Withdraw an ingest producer; session-owned producers are left alone.
    pub fn remove_ingest_producer(&self, producer_id: &ProducerId) -> bool {
        let mut state = self.lock();
        let owned_by_ingest = state
            .live
            .iter()
            .any(|p| p.id == *producer_id && p.owner == ProducerOwner::Ingest);
        if !owned_by_ingest {
            return false;
        }
        state.drop_live(std::slice::from_ref(producer_id));
        self.announce_removed(std::slice::from_ref(producer_id), None);
        true
    }

    pub fn live_producers(&self) -> Vec<ProducerId> {
        self.lock().live.iter().map(|p| p.id.clone()).collect()
    }

    pub fn is_live(&self, producer_id: &ProducerId) -> bool {
        self.lock().live.iter().any(|p| p.id == *producer_id)
    }

    /// Detach whichever session transport has this id (engine-side closure).
    pub fn detach_transport(
        &self,
        transport_id: &TransportId,
    ) -> Option<(ConnectionId, DetachedTransport)> {
        let mut state = self.lock();
        let (owner, direction) = state
            .sessions
            .values()
            .find_map(|s| s.owns_transport(transport_id).map(|d| (s.id().clone(), d)))?;

        let detached = state.sessions.get_mut(&owner)?.detach(direction)?;
        state.drop_live(&detached.producers);
        self.announce_removed(&detached.producers, Some(&owner));
        Some((owner, detached))
    }

    /// Remove a session and its producers; unknown ids are a no-op.
    pub fn close(&self, id: &ConnectionId) -> Option<ClosedSession> {
        let mut state = self.lock();
        let session = state.sessions.remove(id)?;
        let closed = session.into_closed();
        state.drop_live(&closed.producers);
        self.announce_removed(&closed.producers, Some(id));
        Some(closed)
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
