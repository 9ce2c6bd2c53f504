use coshell::sync::{CollabClient, Envelope, LocalRoom};
use coshell::terminal::{BufferSink, TerminalSettings};
use coshell::types::{RemoteUser, SocketId};
use coshell::workspace::Workspace;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Participant {
    pub client: CollabClient,
    pub inbox: mpsc::UnboundedReceiver<Envelope>,
}

impl Participant {
    /// Handle everything delivered so far
    pub fn pump(&mut self) -> usize {
        self.client.drain(&mut self.inbox)
    }
}

/// First participant: opens the room and owns the initial tree.
pub fn host(room: &LocalRoom, socket: &str, workspace: Workspace) -> Participant {
    let (transport, inbox) = room.join(SocketId::new(socket));
    let client = CollabClient::new(
        SocketId::new(socket),
        workspace,
        Arc::new(transport),
        TerminalSettings::default(),
        BufferSink::new(),
    );
    client.start_room();
    Participant { client, inbox }
}

/// Later participant: joins with an empty tree and is announced to the room.
pub fn joiner(room: &LocalRoom, socket: &str, username: &str) -> Participant {
    let user = RemoteUser::new(username, "room-1", SocketId::new(socket));
    let (transport, inbox) = room.join_announced(user);
    let client = CollabClient::new(
        SocketId::new(socket),
        Workspace::new("root"),
        Arc::new(transport),
        TerminalSettings::default(),
        BufferSink::new(),
    );
    Participant { client, inbox }
}

/// Run the join handshake: host answers the announcement, joiner applies the snapshot.
pub fn settle(participants: &mut [&mut Participant]) {
    loop {
        let handled: usize = participants.iter_mut().map(|p| p.pump()).sum();
        if handled == 0 {
            break;
        }
    }
}
