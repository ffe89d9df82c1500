//! JSON-Umschlag fuer WebSocket-Textframes
//!
//! ## Format
//!
//! ```json
//! {"type": "offer", "sender": "alice", "receiver": "bob", "data": {...}}
//! ```
//!
//! Dekodieren laeuft in zwei Schritten: erst in einen flachen Umschlag mit
//! `type` als String, dann in die passende `ClientRequest`-Variante. So wird
//! `data` als `RawValue` unveraendert durchgereicht und ein unbekannter
//! `type` explizit als Fehler gemeldet.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use signalhub_core::Identity;

use crate::error::{ProtocolError, ProtocolResult};
use crate::signal::{ActiveUser, ClientRequest, RelayPayload, Route, ServerEvent};

// ---------------------------------------------------------------------------
// Eingehend
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EingehenderUmschlag {
    #[serde(rename = "type")]
    typ: String,
    sender: Option<String>,
    receiver: Option<String>,
    data: Option<Box<RawValue>>,
}

impl EingehenderUmschlag {
    fn feld(wert: Option<String>, typ: &'static str, feld: &'static str) -> ProtocolResult<Identity> {
        match wert {
            Some(name) if !name.is_empty() => Ok(Identity::from(name)),
            _ => Err(ProtocolError::FeldFehlt { typ, feld }),
        }
    }

    fn route(self, typ: &'static str) -> ProtocolResult<Route> {
        Ok(Route {
            sender: Self::feld(self.sender, typ, "sender")?,
            receiver: Self::feld(self.receiver, typ, "receiver")?,
        })
    }

    fn relay(mut self, typ: &'static str) -> ProtocolResult<RelayPayload> {
        let payload = self
            .data
            .take()
            .ok_or(ProtocolError::FeldFehlt { typ, feld: "data" })?;
        Ok(RelayPayload {
            route: self.route(typ)?,
            payload,
        })
    }
}

/// Dekodiert einen Textframe in eine `ClientRequest`
pub fn decode(text: &str) -> ProtocolResult<ClientRequest> {
    let mut umschlag: EingehenderUmschlag = serde_json::from_str(text)?;
    let typ = std::mem::take(&mut umschlag.typ);

    let request = match typ.as_str() {
        "join" => ClientRequest::Join {
            name: EingehenderUmschlag::feld(umschlag.sender, "join", "sender")?,
        },
        "activeUsers" => ClientRequest::ActiveUsers,
        "leave" => ClientRequest::Leave,
        "call" => ClientRequest::Call(umschlag.route("call")?),
        "cancelCall" => ClientRequest::CancelCall(umschlag.route("cancelCall")?),
        "acceptCall" => ClientRequest::AcceptCall(umschlag.route("acceptCall")?),
        "hangUp" => ClientRequest::HangUp(umschlag.route("hangUp")?),
        "offer" => ClientRequest::Offer(umschlag.relay("offer")?),
        "answer" => ClientRequest::Answer(umschlag.relay("answer")?),
        "candidate" => ClientRequest::Candidate(umschlag.relay("candidate")?),
        _ => return Err(ProtocolError::UnbekannterTyp(typ.clone())),
    };

    Ok(request)
}

// ---------------------------------------------------------------------------
// Ausgehend
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JoinDaten {
    result: bool,
}

#[derive(Serialize)]
struct UserDaten<'a> {
    users: &'a [ActiveUser],
}

#[derive(Serialize)]
#[serde(untagged)]
enum AusgehendeDaten<'a> {
    Join(JoinDaten),
    Users(UserDaten<'a>),
    Roh(&'a RawValue),
}

#[derive(Serialize)]
struct AusgehenderUmschlag<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender: Option<&'a Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver: Option<&'a Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<AusgehendeDaten<'a>>,
}

/// Kodiert ein `ServerEvent` als JSON-Textframe
pub fn encode(event: &ServerEvent) -> serde_json::Result<String> {
    let typ = event.typ();
    let umschlag = match event {
        ServerEvent::JoinResult { receiver, result } => AusgehenderUmschlag {
            typ,
            sender: None,
            receiver: Some(receiver),
            data: Some(AusgehendeDaten::Join(JoinDaten { result: *result })),
        },
        ServerEvent::ActiveUsers(users) => AusgehenderUmschlag {
            typ,
            sender: None,
            receiver: None,
            data: Some(AusgehendeDaten::Users(UserDaten { users })),
        },
        ServerEvent::Call(route)
        | ServerEvent::CancelCall(route)
        | ServerEvent::AcceptCall(route)
        | ServerEvent::HangUp(route) => AusgehenderUmschlag {
            typ,
            sender: Some(&route.sender),
            receiver: Some(&route.receiver),
            data: None,
        },
        ServerEvent::Offer(relay) | ServerEvent::Answer(relay) | ServerEvent::Candidate(relay) => {
            AusgehenderUmschlag {
                typ,
                sender: Some(&relay.route.sender),
                receiver: Some(&relay.route.receiver),
                data: Some(AusgehendeDaten::Roh(&relay.payload)),
            }
        }
    };

    serde_json::to_string(&umschlag)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
