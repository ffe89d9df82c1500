//! signalhub-signaling – WebSocket-Signaling-Hub
//!
//! Dieser Crate implementiert den Hub, ueber den sich zwei Peers finden und
//! ihre Session-Setup-Nachrichten (offer, answer, candidate) austauschen.
//! Medien laufen nie ueber den Hub.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (SignalingServer, axum)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Lese-Task + ein Schreib-Task)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- SessionHandler   (join, leave, activeUsers, Verbindungsende)
//!     +-- CallStateMachine (call, cancelCall, acceptCall, hangUp)
//!     +-- MessageRouter    (offer, answer, candidate)
//!
//! SessionRegistry     – Identity <-> Verbindung, Busy-Flags, ein RwLock
//! PresenceBroadcaster – activeUsers-Snapshot an alle
//! ```

pub mod call;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod presence;
pub mod registry;
pub mod router;
pub mod sender;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use call::{CallOutcome, CallStateMachine};
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use presence::PresenceBroadcaster;
pub use registry::SessionRegistry;
pub use router::MessageRouter;
pub use sender::ClientSender;
pub use server_state::{SignalingConfig, SignalingState};
pub use ws::SignalingServer;
