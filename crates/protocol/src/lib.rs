//! signalhub-protocol – Protokoll-Definitionen
//!
//! Dieses Crate definiert den JSON-Umschlag (`type`, `sender`, `receiver`,
//! `data`) und die geschlossenen Nachrichten-Enums, die zwischen Client und
//! Hub ausgetauscht werden.

pub mod envelope;
pub mod error;
pub mod signal;

pub use error::{ProtocolError, ProtocolResult};
pub use signal::{ActiveUser, ClientRequest, RelayKind, RelayPayload, Route, ServerEvent};
