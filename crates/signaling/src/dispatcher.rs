//! Message-Dispatcher – Routet ClientRequests an die richtigen Komponenten
//!
//! Der Dispatcher empfaengt dekodierte Anfragen einer `ClientConnection` und
//! verteilt sie nach Typ:
//! - `join`, `leave`, `activeUsers` -> `session_handler`
//! - `call`, `cancelCall`, `acceptCall`, `hangUp` -> `CallStateMachine`
//! - `offer`, `answer`, `candidate` -> `MessageRouter`
//!
//! Keine Anfrage erzeugt eine Fehlerantwort. Alles, was nicht zugestellt
//! werden kann, wird nur geloggt.

use signalhub_core::ConnectionKey;
use signalhub_protocol::{ClientRequest, RelayKind};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers::session_handler;
use crate::sender::ClientSender;
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
#[derive(Debug, Clone)]
pub struct DispatcherContext {
    /// Schluessel fuer die Rueckwaertssuche in der Registry
    pub key: ConnectionKey,
    /// Remote-Adresse (nur fuer Logs)
    pub peer_addr: SocketAddr,
    /// Send-Queue dieser Verbindung
    pub sender: ClientSender,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende Anfrage
    ///
    /// Alle Antworten laufen ueber Send-Queues, es gibt keinen Rueckgabewert.
    pub fn dispatch(&self, request: ClientRequest, ctx: &DispatcherContext) {
        tracing::trace!(verbindung = %ctx.key, typ = request.typ(), "Anfrage empfangen");

        match request {
            // -------------------------------------------------------------------
            // Mitgliedschaft
            // -------------------------------------------------------------------
            ClientRequest::Join { name } => {
                session_handler::handle_join(name, ctx, &self.state);
            }
            ClientRequest::Leave => session_handler::handle_leave(ctx, &self.state),
            ClientRequest::ActiveUsers => session_handler::handle_active_users(ctx, &self.state),

            // -------------------------------------------------------------------
            // Call-Control
            // -------------------------------------------------------------------
            ClientRequest::Call(route) => {
                self.state.calls.anrufen(route);
            }
            ClientRequest::CancelCall(route) => {
                self.state.calls.abbrechen(route);
            }
            ClientRequest::AcceptCall(route) => {
                self.state.calls.annehmen(route);
            }
            ClientRequest::HangUp(route) => {
                self.state.calls.auflegen(route);
            }

            // -------------------------------------------------------------------
            // Session-Setup (opake Weiterleitung)
            // -------------------------------------------------------------------
            ClientRequest::Offer(relay) => {
                self.state.router.weiterleiten(RelayKind::Offer, relay);
            }
            ClientRequest::Answer(relay) => {
                self.state.router.weiterleiten(RelayKind::Answer, relay);
            }
            ClientRequest::Candidate(relay) => {
                self.state.router.weiterleiten(RelayKind::Candidate, relay);
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    pub fn client_cleanup(&self, ctx: &DispatcherContext) {
        session_handler::handle_disconnect(ctx, &self.state);
        tracing::debug!(verbindung = %ctx.key, "Verbindungs-Ressourcen bereinigt");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use signalhub_protocol::{envelope, ServerEvent};
    use tokio::sync::mpsc;

    struct Client {
        ctx: DispatcherContext,
        rx: mpsc::Receiver<ServerEvent>,
    }

    impl Client {
        fn neu() -> Self {
            let key = ConnectionKey::new();
            let (sender, rx) = ClientSender::neu(key, 32);
            Self {
                ctx: DispatcherContext {
                    key,
                    peer_addr: "127.0.0.1:50000".parse().unwrap(),
                    sender,
                },
                rx,
            }
        }

        fn senden(&self, dispatcher: &MessageDispatcher, text: &str) {
            let request = envelope::decode(text).expect("Gueltige Testnachricht");
            dispatcher.dispatch(request, &self.ctx);
        }

        fn empfangen(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn letzter_snapshot(events: &[ServerEvent]) -> Vec<(String, bool)> {
        events
            .iter()
            .rev()
            .find_map(|e| match e {
                ServerEvent::ActiveUsers(users) => Some(
                    users
                        .iter()
                        .map(|u| (u.name.to_string(), u.in_call))
                        .collect(),
                ),
                _ => None,
            })
            .expect("activeUsers erwartet")
    }

    #[test]
    fn alice_ruft_bob_an() {
        let dispatcher = MessageDispatcher::neu(SignalingState::neu(SignalingConfig::default()));
        let mut alice = Client::neu();
        let mut bob = Client::neu();

        alice.senden(&dispatcher, r#"{"type":"join","sender":"alice"}"#);
        bob.senden(&dispatcher, r#"{"type":"join","sender":"bob"}"#);
        alice.empfangen();
        bob.empfangen();

        alice.senden(&dispatcher, r#"{"type":"call","sender":"alice","receiver":"bob"}"#);
        let bei_bob = bob.empfangen();
        assert_eq!(bei_bob[0].typ(), "call");
        assert_eq!(
            letzter_snapshot(&bei_bob),
            vec![("alice".to_string(), true), ("bob".to_string(), true)]
        );
        alice.empfangen();

        bob.senden(&dispatcher, r#"{"type":"acceptCall","sender":"bob","receiver":"alice"}"#);
        let bei_alice = alice.empfangen();
        assert_eq!(bei_alice.len(), 1);
        assert_eq!(bei_alice[0].typ(), "acceptCall");

        alice.senden(
            &dispatcher,
            r#"{"type":"offer","sender":"alice","receiver":"bob","data":{"sdp":"v=0"}}"#,
        );
        match bob.empfangen().as_slice() {
            [ServerEvent::Offer(relay)] => assert_eq!(relay.raw(), r#"{"sdp":"v=0"}"#),
            andere => panic!("Erwartet genau ein offer, erhalten {andere:?}"),
        }

        alice.senden(&dispatcher, r#"{"type":"hangUp","sender":"alice","receiver":"bob"}"#);
        let bei_bob = bob.empfangen();
        assert_eq!(bei_bob[0].typ(), "hangUp");
        assert_eq!(
            letzter_snapshot(&bei_bob),
            vec![("alice".to_string(), false), ("bob".to_string(), false)]
        );
    }

    #[test]
    fn cleanup_broadcastet_an_verbleibende() {
        let dispatcher = MessageDispatcher::neu(SignalingState::neu(SignalingConfig::default()));
        let mut alice = Client::neu();
        let mut bob = Client::neu();

        alice.senden(&dispatcher, r#"{"type":"join","sender":"alice"}"#);
        bob.senden(&dispatcher, r#"{"type":"join","sender":"bob"}"#);
        alice.empfangen();
        bob.empfangen();

        dispatcher.client_cleanup(&alice.ctx);
        assert_eq!(
            letzter_snapshot(&bob.empfangen()),
            vec![("bob".to_string(), false)]
        );
        assert!(alice.empfangen().is_empty());
    }
}
