use std::time::{Duration, Instant};

use crate::domain::value_objects::{ConnectionId, ConsumerId, Direction, ProducerId, TransportId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Created,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSlot {
    id: TransportId,
    state: TransportState,
}

impl TransportSlot {
    pub fn id(&self) -> &TransportId {
        &self.id
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == TransportState::Connected
    }
}

/// Negotiation progress of one direction of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Uninitialized,
    TransportCreated,
    TransportConnected,
    /// Producing (send side) or consuming (receive side) `count` streams
    Active { count: usize },
}

/// A transport removed from a session, with the producers that lived on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedTransport {
    pub direction: Direction,
    pub transport_id: TransportId,
    pub producers: Vec<ProducerId>,
}

/// Everything a session held when it was closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub id: ConnectionId,
    pub transports: Vec<TransportId>,
    pub producers: Vec<ProducerId>,
    pub uptime: Duration,
}

/// State of one signaling connection
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    opened_at: Instant,
    send: Option<TransportSlot>,
    recv: Option<TransportSlot>,
    producers: Vec<ProducerId>,
    // Each consumer with the producer feeding it
    consumers: Vec<(ConsumerId, ProducerId)>,
}

impl Session {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            opened_at: Instant::now(),
            send: None,
            recv: None,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn uptime(&self) -> Duration {
        self.opened_at.elapsed()
    }

    pub fn transport(&self, direction: Direction) -> Option<&TransportSlot> {
        match direction {
            Direction::Send => self.send.as_ref(),
            Direction::Recv => self.recv.as_ref(),
        }
    }

    pub fn owns_transport(&self, transport_id: &TransportId) -> Option<Direction> {
        [Direction::Send, Direction::Recv]
            .into_iter()
            .find(|d| self.transport(*d).map(|t| t.id()) == Some(transport_id))
    }

    pub fn producers(&self) -> &[ProducerId] {
        &self.producers
    }

    pub fn consumers(&self) -> impl Iterator<Item = &ConsumerId> {
        self.consumers.iter().map(|(consumer_id, _)| consumer_id)
    }

    pub fn send_state(&self) -> TrackState {
        Self::track_state(self.send.as_ref(), self.producers.len())
    }

    pub fn recv_state(&self) -> TrackState {
        Self::track_state(self.recv.as_ref(), self.consumers.len())
    }

    fn track_state(slot: Option<&TransportSlot>, streams: usize) -> TrackState {
        match slot {
            None => TrackState::Uninitialized,
            Some(slot) if !slot.is_connected() => TrackState::TransportCreated,
            Some(_) if streams == 0 => TrackState::TransportConnected,
            Some(_) => TrackState::Active { count: streams },
        }
    }

    /// Attach a freshly created transport, returning the one it replaces.
    pub fn attach_transport(
        &mut self,
        direction: Direction,
        transport_id: TransportId,
    ) -> Option<DetachedTransport> {
        let displaced = self.detach(direction);
        let slot = Some(TransportSlot {
            id: transport_id,
            state: TransportState::Created,
        });
        match direction {
            Direction::Send => self.send = slot,
            Direction::Recv => self.recv = slot,
        }
        displaced
    }

    pub fn detach(&mut self, direction: Direction) -> Option<DetachedTransport> {
        let slot = match direction {
            Direction::Send => self.send.take(),
            Direction::Recv => self.recv.take(),
        }?;

        let producers = match direction {
            Direction::Send => std::mem::take(&mut self.producers),
            Direction::Recv => {
                self.consumers.clear();
                Vec::new()
            }
        };

        Some(DetachedTransport {
            direction,
            transport_id: slot.id,
            producers,
        })
    }

    /// Returns false when there is no transport in that direction.
    pub fn mark_connected(&mut self, direction: Direction) -> bool {
        let slot = match direction {
            Direction::Send => self.send.as_mut(),
            Direction::Recv => self.recv.as_mut(),
        };
        match slot {
            Some(slot) => {
                slot.state = TransportState::Connected;
                true
            }
            None => false,
        }
    }

    pub fn add_producer(&mut self, producer_id: ProducerId) {
        self.producers.push(producer_id);
    }

    pub fn add_consumer(&mut self, consumer_id: ConsumerId, producer_id: ProducerId) {
        self.consumers.push((consumer_id, producer_id));
    }

    /// Forget consumers fed by any of these producers; returns how many went.
    pub fn drop_consumers_of(&mut self, producers: &[ProducerId]) -> usize {
        let before = self.consumers.len();
        self.consumers
            .retain(|(_, producer_id)| !producers.contains(producer_id));
        before - self.consumers.len()
    }

    pub fn into_closed(self) -> ClosedSession {
        let uptime = self.uptime();
        let transports = [self.send, self.recv]
            .into_iter()
            .flatten()
            .map(|slot| slot.id)
            .collect();
        ClosedSession {
            id: self.id,
            transports,
            producers: self.producers,
            uptime,
        }
    }
}
