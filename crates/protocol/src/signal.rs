//! Nachrichtentypen des Signal-Hubs
//!
//! Jeder `type` des Umschlags hat genau eine Enum-Variante, die nur die
//! Felder traegt, die dieser Typ tatsaechlich verwendet.
//!
//! ## Client -> Hub
//! `join`, `activeUsers`, `leave`, `call`, `cancelCall`, `acceptCall`,
//! `hangUp`, `offer`, `answer`, `candidate`
//!
//! ## Hub -> Client
//! `join` (Ergebnis), `activeUsers` (Snapshot), sowie die weitergeleiteten
//! Call-Control- und Relay-Nachrichten.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use signalhub_core::Identity;

// ---------------------------------------------------------------------------
// Bausteine
// ---------------------------------------------------------------------------

/// Absender und Empfaenger einer Punkt-zu-Punkt-Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub sender: Identity,
    pub receiver: Identity,
}

impl Route {
    pub fn new(sender: impl Into<Identity>, receiver: impl Into<Identity>) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }
}

/// Opake Nutzlast von `offer`, `answer` und `candidate`
///
/// Der Hub parst den Inhalt nie. `RawValue` haelt die Bytes exakt so,
/// wie sie vom Absender kamen.
#[derive(Debug, Clone)]
pub struct RelayPayload {
    pub route: Route,
    pub payload: Box<RawValue>,
}

impl RelayPayload {
    /// Gibt die Nutzlast als rohen JSON-Text zurueck
    pub fn raw(&self) -> &str {
        self.payload.get()
    }
}

/// Die drei weitergeleiteten Session-Setup-Typen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayKind {
    Offer,
    Answer,
    Candidate,
}

impl RelayKind {
    /// Wire-Name des Typs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
        }
    }

    /// Baut das ausgehende Event dieses Typs
    pub fn event(self, relay: RelayPayload) -> ServerEvent {
        match self {
            Self::Offer => ServerEvent::Offer(relay),
            Self::Answer => ServerEvent::Answer(relay),
            Self::Candidate => ServerEvent::Candidate(relay),
        }
    }
}

impl std::fmt::Display for RelayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eintrag im Presence-Snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub name: Identity,
    pub in_call: bool,
}

// ---------------------------------------------------------------------------
// Client -> Hub
// ---------------------------------------------------------------------------

/// Alle Anfragen, die ein Client senden kann
#[derive(Debug, Clone)]
pub enum ClientRequest {
    /// Unter `name` anmelden
    Join { name: Identity },
    /// Aktuellen Presence-Snapshot nur fuer diese Verbindung abfragen
    ActiveUsers,
    /// Gebundene Identity abmelden, Verbindung bleibt offen
    Leave,
    Call(Route),
    CancelCall(Route),
    AcceptCall(Route),
    HangUp(Route),
    Offer(RelayPayload),
    Answer(RelayPayload),
    Candidate(RelayPayload),
}

impl ClientRequest {
    /// Wire-Name des Typs
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::ActiveUsers => "activeUsers",
            Self::Leave => "leave",
            Self::Call(_) => "call",
            Self::CancelCall(_) => "cancelCall",
            Self::AcceptCall(_) => "acceptCall",
            Self::HangUp(_) => "hangUp",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::Candidate(_) => "candidate",
        }
    }
}

// ---------------------------------------------------------------------------
// Hub -> Client
// ---------------------------------------------------------------------------

/// Alle Nachrichten, die der Hub an einen Client ausliefert
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Ergebnis einer Join-Anfrage, nur an die anfragende Verbindung
    JoinResult { receiver: Identity, result: bool },
    /// Presence-Snapshot aller registrierten Identities
    ActiveUsers(Vec<ActiveUser>),
    Call(Route),
    CancelCall(Route),
    AcceptCall(Route),
    HangUp(Route),
    Offer(RelayPayload),
    Answer(RelayPayload),
    Candidate(RelayPayload),
}

impl ServerEvent {
    /// Wire-Name des Typs
    pub fn typ(&self) -> &'static str {
        match self {
            Self::JoinResult { .. } => "join",
            Self::ActiveUsers(_) => "activeUsers",
            Self::Call(_) => "call",
            Self::CancelCall(_) => "cancelCall",
            Self::AcceptCall(_) => "acceptCall",
            Self::HangUp(_) => "hangUp",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::Candidate(_) => "candidate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_kind_baut_passendes_event() {
        let relay = RelayPayload {
            route: Route::new("alice", "bob"),
            payload: RawValue::from_string("{\"sdp\":\"v=0\"}".to_string()).unwrap(),
        };
        let event = RelayKind::Candidate.event(relay);
        assert_eq!(event.typ(), "candidate");
        match event {
            ServerEvent::Candidate(p) => assert_eq!(p.route, Route::new("alice", "bob")),
            andere => panic!("Erwartet candidate, erhalten {andere:?}"),
        }
    }

    #[test]
    fn active_user_camel_case() {
        let user = ActiveUser {
            name: Identity::from("alice"),
            in_call: true,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"name":"alice","inCall":true}"#);
    }
}
