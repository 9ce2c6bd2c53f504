//! CollabClient: composition root of one participant.
//!
//! Owns the shared workspace and the handlers acting on it, and routes every
//! inbound event to the handler responsible for it. Recoverable failures are
//! logged and published as notices instead of stopping the event loop.

use crate::error::ApiError;
use crate::sync::broadcaster::SyncBroadcaster;
use crate::sync::notice::{notice_channel, publish, Notice};
use crate::sync::protocol::{Envelope, ProtocolEvent};
use crate::sync::session::SessionSyncHandler;
use crate::sync::transport::EventTransport;
use crate::terminal::{BufferSink, OutputSink, SharedDispatcher, TerminalDispatcher, TerminalSettings};
use crate::types::SocketId;
use crate::workspace::{SharedWorkspace, Workspace};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

pub struct CollabClient<S: OutputSink = BufferSink> {
    socket_id: SocketId,
    workspace: SharedWorkspace,
    broadcaster: SyncBroadcaster,
    session: SessionSyncHandler,
    terminal: SharedDispatcher<S>,
    notices: broadcast::Sender<Notice>,
}

impl<S: OutputSink> CollabClient<S> {
    pub fn new(
        socket_id: SocketId,
        workspace: Workspace,
        transport: Arc<dyn EventTransport>,
        settings: TerminalSettings,
        sink: S,
    ) -> Self {
        let workspace = workspace.into_shared();
        let notices = notice_channel();
        let broadcaster = SyncBroadcaster::new(
            workspace.clone(),
            transport.clone(),
            socket_id.clone(),
            notices.clone(),
        );
        let session = SessionSyncHandler::new(
            workspace.clone(),
            transport.clone(),
            socket_id.clone(),
            notices.clone(),
        );
        let terminal = Arc::new(Mutex::new(TerminalDispatcher::new(
            workspace.clone(),
            transport,
            socket_id.clone(),
            settings,
            sink,
        )));
        Self {
            socket_id,
            workspace,
            broadcaster,
            session,
            terminal,
            notices,
        }
    }

    /// This client opens the room; no snapshot will arrive.
    pub fn start_room(&self) {
        self.session.mark_synced();
        info!(socket_id = %self.socket_id, "Started room");
    }

    pub fn socket_id(&self) -> &SocketId {
        &self.socket_id
    }

    pub fn workspace(&self) -> &SharedWorkspace {
        &self.workspace
    }

    /// Local tree intents go through here
    pub fn sync(&self) -> &SyncBroadcaster {
        &self.broadcaster
    }

    pub fn session(&self) -> &SessionSyncHandler {
        &self.session
    }

    pub fn terminal(&self) -> &SharedDispatcher<S> {
        &self.terminal
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Route one inbound envelope; our own envelopes are ignored.
    pub fn handle_envelope(&self, envelope: Envelope) -> Result<(), ApiError> {
        if envelope.from == self.socket_id {
            debug!(event = envelope.event.name(), "Ignoring own envelope");
            return Ok(());
        }
        self.handle_event(envelope.event)
    }

    /// Decode and route one raw JSON envelope
    pub fn handle_json(&self, raw: &str) -> Result<(), ApiError> {
        let envelope = Envelope::from_json(raw)?;
        self.handle_envelope(envelope)
    }

    /// Route one inbound event to its handler.
    pub fn handle_event(&self, event: ProtocolEvent) -> Result<(), ApiError> {
        let name = event.name();
        let result = self.route(event);
        self.terminal.lock().refresh_location();
        match result {
            Ok(()) => Ok(()),
            Err(ApiError::Workspace(err)) if err.is_recoverable() => {
                warn!(event = name, error = %err, "Could not apply event");
                publish(&self.notices, Notice::Problem { message: err.to_string() });
                Ok(())
            }
            Err(ApiError::Transport(err)) => {
                warn!(event = name, error = %err, "Could not answer event");
                publish(&self.notices, Notice::Problem { message: err.to_string() });
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn route(&self, event: ProtocolEvent) -> Result<(), ApiError> {
        if let Some(backend) = event.as_backend() {
            self.terminal.lock().handle_backend(backend);
            return Ok(());
        }
        match event {
            ProtocolEvent::SyncFileStructure(sync) => {
                self.session.on_snapshot(&sync)?;
            }
            ProtocolEvent::UserJoined(joined) => {
                self.session.on_user_joined(&joined.user)?;
            }
            ProtocolEvent::StructureUpdate(update) => {
                self.broadcaster.apply_structure_update(&update)?;
            }
            ProtocolEvent::TerminalCommand(_) | ProtocolEvent::TerminalSignal(_) => {
                debug!("Ignoring backend-bound event");
            }
            mutation => {
                self.broadcaster.apply_remote(&mutation)?;
            }
        }
        Ok(())
    }

    /// Handle every envelope already waiting on `rx`; returns how many.
    pub fn drain(&self, rx: &mut mpsc::UnboundedReceiver<Envelope>) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = rx.try_recv() {
            if let Err(err) = self.handle_envelope(envelope) {
                warn!(error = %err, "Dropped inbound event");
            }
            handled += 1;
        }
        handled
    }

    /// Handle envelopes until the inbound stream closes.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            if let Err(err) = self.handle_envelope(envelope) {
                warn!(error = %err, "Dropped inbound event");
            }
        }
        info!(socket_id = %self.socket_id, "Inbound stream closed");
    }
}
