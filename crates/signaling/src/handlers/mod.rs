//! Handler fuer Nachrichten, die ueber reine Weiterleitung hinausgehen
//!
//! Call-Control und Relay-Nachrichten gehen direkt an `CallStateMachine`
//! bzw. `MessageRouter`.

pub mod session_handler;
