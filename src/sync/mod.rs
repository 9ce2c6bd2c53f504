//! Synchronisation domain: wire protocol, transports, and the handlers that
//! keep every participant's workspace converged.

pub mod broadcaster;
pub mod client;
pub mod notice;
pub mod protocol;
pub mod room;
pub mod session;
pub mod transport;

pub use broadcaster::SyncBroadcaster;
pub use client::CollabClient;
pub use notice::Notice;
pub use protocol::{BackendEvent, Envelope, ProtocolEvent, Recipient};
pub use room::{LocalRoom, RoomTransport};
pub use session::{SessionSyncHandler, SyncState};
pub use transport::{ChannelTransport, DisconnectedTransport, EventTransport, RecordingTransport};
