//! In-process relay for one collaborative room.
//!
//! Room envelopes fan out to every member except the sender, peer envelopes
//! go to exactly one member, backend envelopes go to the attached backend
//! shell. Delivery per sender is FIFO since every member owns one unbounded
//! channel.

use crate::error::TransportError;
use crate::sync::protocol::{Envelope, ProtocolEvent, Recipient, UserJoined};
use crate::sync::transport::EventTransport;
use crate::types::{RemoteUser, SocketId};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Socket id used for envelopes sent by the relay or the backend itself
pub const RELAY_SOCKET: &str = "relay";

#[derive(Default)]
struct RoomInner {
    members: Vec<(SocketId, mpsc::UnboundedSender<Envelope>)>,
    backend: Option<mpsc::UnboundedSender<Envelope>>,
}

/// Shared handle to a room; clones address the same room.
#[derive(Clone, Default)]
pub struct LocalRoom {
    inner: Arc<Mutex<RoomInner>>,
}

impl LocalRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member without announcing it.
    pub fn join(&self, socket: SocketId) -> (RoomTransport, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.inner.lock();
            inner.members.retain(|(id, _)| id != &socket);
            inner.members.push((socket.clone(), tx));
        }
        debug!(socket_id = %socket, "Member joined room");
        let transport = RoomTransport {
            room: self.clone(),
            socket,
        };
        (transport, rx)
    }

    /// Add a member and tell everyone already present, the way the relay
    /// announces a new connection.
    pub fn join_announced(
        &self,
        user: RemoteUser,
    ) -> (RoomTransport, mpsc::UnboundedReceiver<Envelope>) {
        let joined = self.join(user.socket_id.clone());
        let announcement = Envelope::new(
            user.socket_id.clone(),
            Recipient::Room,
            ProtocolEvent::UserJoined(UserJoined { user }),
        );
        // A room with no one else in it has nobody to tell.
        let _ = self.deliver(announcement);
        joined
    }

    pub fn leave(&self, socket: &SocketId) {
        self.inner.lock().members.retain(|(id, _)| id != socket);
        debug!(socket_id = %socket, "Member left room");
    }

    /// Attach the backend shell; returns the stream of envelopes addressed to it.
    pub fn attach_backend(&self) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().backend = Some(tx);
        rx
    }

    pub fn detach_backend(&self) {
        self.inner.lock().backend = None;
    }

    pub fn has_backend(&self) -> bool {
        self.inner
            .lock()
            .backend
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Send an event from the backend shell to one member.
    pub fn reply_from_backend(
        &self,
        to: &SocketId,
        event: ProtocolEvent,
    ) -> Result<(), TransportError> {
        self.deliver(Envelope::new(
            SocketId::new(RELAY_SOCKET),
            Recipient::Peer(to.clone()),
            event,
        ))
    }

    /// Send an event from the backend shell to every member.
    pub fn broadcast_from_backend(&self, event: ProtocolEvent) -> Result<(), TransportError> {
        self.deliver(Envelope::new(
            SocketId::new(RELAY_SOCKET),
            Recipient::Room,
            event,
        ))
    }

    pub fn members(&self) -> Vec<SocketId> {
        self.inner
            .lock()
            .members
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn is_member(&self, socket: &SocketId) -> bool {
        self.inner.lock().members.iter().any(|(id, _)| id == socket)
    }

    /// Route one envelope.
    pub fn deliver(&self, envelope: Envelope) -> Result<(), TransportError> {
        let inner = self.inner.lock();
        trace!(from = %envelope.from, event = envelope.event.name(), "Routing envelope");
        match &envelope.to {
            Recipient::Room => {
                let mut delivered = 0;
                for (id, tx) in inner.members.iter().filter(|(id, _)| id != &envelope.from) {
                    if tx.send(envelope.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        debug!(socket_id = %id, "Dropping envelope for closed member");
                    }
                }
                if delivered == 0 {
                    trace!(event = envelope.event.name(), "No other members to receive event");
                }
                Ok(())
            }
            Recipient::Peer(target) => {
                let (_, tx) = inner
                    .members
                    .iter()
                    .find(|(id, _)| id == target)
                    .ok_or_else(|| TransportError::UnknownPeer(target.to_string()))?;
                tx.send(envelope.clone())
                    .map_err(|_| TransportError::UnknownPeer(target.to_string()))
            }
            Recipient::Backend => match &inner.backend {
                Some(tx) => tx
                    .send(envelope.clone())
                    .map_err(|_| TransportError::Disconnected),
                None => Err(TransportError::Disconnected),
            },
        }
    }
}

/// Transport of one room member
#[derive(Clone)]
pub struct RoomTransport {
    room: LocalRoom,
    socket: SocketId,
}

impl RoomTransport {
    pub fn socket_id(&self) -> &SocketId {
        &self.socket
    }

    pub fn room(&self) -> &LocalRoom {
        &self.room
    }
}

impl EventTransport for RoomTransport {
    fn emit(&self, envelope: Envelope) -> Result<(), TransportError> {
        if !self.room.is_member(&self.socket) {
            return Err(TransportError::Disconnected);
        }
        self.room.deliver(envelope)
    }

    fn is_connected(&self) -> bool {
        self.room.is_member(&self.socket)
    }
}
