//! Event transport seam
//!
//! Sending is fire-and-forget: `emit` only reports whether the envelope left
//! this client, never whether anyone applied it.

use crate::error::TransportError;
use crate::sync::protocol::Envelope;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Outbound half of the duplex connection of one client
pub trait EventTransport: Send + Sync {
    fn emit(&self, envelope: Envelope) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// Transport backed by a tokio unbounded channel; the receiver is the wire.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { tx }
    }
}

impl EventTransport for ChannelTransport {
    fn emit(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.tx
            .send(envelope)
            .map_err(|_| TransportError::Disconnected)
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// A transport that is never connected; used when running offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedTransport;

impl EventTransport for DisconnectedTransport {
    fn emit(&self, _envelope: Envelope) -> Result<(), TransportError> {
        Err(TransportError::Disconnected)
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Keeps every emitted envelope in memory.
#[derive(Debug)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Envelope>>,
    connected: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Envelopes emitted so far, oldest first
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }

    pub fn take(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl EventTransport for RecordingTransport {
    fn emit(&self, envelope: Envelope) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.sent.lock().push(envelope);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
