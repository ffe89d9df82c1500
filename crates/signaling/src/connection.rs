//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task, dazu genau einen Schreib-Task, der die Send-Queue leert.
//!
//! ```text
//!   WebSocket ──▶ Lese-Schleife ──▶ MessageDispatcher
//!                                        │
//!   WebSocket ◀── Schreib-Task ◀── Send-Queue ◀── Router / Presence / Calls
//! ```
//!
//! Die Lese-Schleife endet bei Close-Frame, Lesefehler oder Shutdown. Danach
//! wird die Identity der Verbindung genau einmal freigegeben.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use signalhub_core::ConnectionKey;
use signalhub_protocol::{envelope, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{SignalingError, SignalingResult};
use crate::sender::ClientSender;
use crate::server_state::SignalingState;

/// Wie lange der Schreib-Task nach Verbindungsende noch leeren darf
pub const SCHREIBER_NACHLAUF: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
    key: ConnectionKey,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischem Verbindungsschluessel
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            peer_addr,
            key: ConnectionKey::new(),
        }
    }

    /// Schluessel dieser Verbindung
    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let key = self.key;
        tracing::info!(peer = %peer_addr, verbindung = %key, "Neue Verbindung");

        let (ws_tx, mut ws_rx) = socket.split();
        let (sender, sende_rx) = ClientSender::neu(key, self.state.config.send_queue_groesse);
        let schreiber = tokio::spawn(schreib_task(ws_tx, sende_rx, key));

        let ctx = DispatcherContext {
            key,
            peer_addr,
            sender,
        };
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            if let Err(e) = self.frame_verarbeiten(nachricht, &dispatcher, &ctx) {
                                if matches!(e, SignalingError::VerbindungGeschlossen) {
                                    tracing::info!(verbindung = %key, "Close-Frame vom Client");
                                    break;
                                }
                                tracing::warn!(
                                    verbindung = %key,
                                    fehler = %e,
                                    "Nachricht verworfen"
                                );
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(verbindung = %key, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(verbindung = %key, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(verbindung = %key, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        dispatcher.client_cleanup(&ctx);

        // Letztes Handle auf die Queue fallen lassen, der Schreib-Task
        // leert den Rest und schliesst den Socket
        drop(ctx);
        schreiber_abwarten(schreiber, SCHREIBER_NACHLAUF, key).await;

        tracing::info!(peer = %peer_addr, verbindung = %key, "Verbindungs-Task beendet");
    }

    /// Verarbeitet einen einzelnen eingehenden Frame
    fn frame_verarbeiten(
        &self,
        nachricht: Message,
        dispatcher: &MessageDispatcher,
        ctx: &DispatcherContext,
    ) -> SignalingResult<()> {
        match nachricht {
            Message::Text(text) => {
                let request = envelope::decode(&text)?;
                dispatcher.dispatch(request, ctx);
                Ok(())
            }
            Message::Binary(daten) => Err(SignalingError::BinaerFrame(daten.len())),
            // Ping/Pong beantwortet axum selbst
            Message::Ping(_) | Message::Pong(_) => Ok(()),
            Message::Close(_) => Err(SignalingError::VerbindungGeschlossen),
        }
    }
}

// ---------------------------------------------------------------------------
// Schreib-Task
// ---------------------------------------------------------------------------

/// Einziger Schreiber auf den Socket einer Verbindung
///
/// Endet, wenn alle Handles der Queue weg sind oder der Socket einen
/// Schreibfehler meldet. Danach ist das Handle veraltet.
async fn schreib_task(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut sende_rx: mpsc::Receiver<ServerEvent>,
    key: ConnectionKey,
) {
    while let Some(event) = sende_rx.recv().await {
        match event_schreiben(&mut ws_tx, &event).await {
            Ok(()) => {}
            Err(e @ SignalingError::Kodierung(_)) => {
                tracing::error!(verbindung = %key, typ = event.typ(), fehler = %e, "Event uebersprungen");
            }
            Err(e) => {
                tracing::warn!(verbindung = %key, fehler = %e, "Senden fehlgeschlagen");
                return;
            }
        }
    }

    // Schliesst mit Close-Frame, Fehler bei bereits geschlossenem Socket egal
    let _ = ws_tx.close().await;
}

/// Wartet hoechstens `frist` auf das Ende des Schreib-Tasks
///
/// Liest der Client nicht mehr, kann `send` bei offener TCP-Verbindung
/// unbegrenzt haengen. Nach Ablauf der Frist wird der Task abgebrochen.
/// Gibt `false` zurueck, wenn abgebrochen werden musste.
async fn schreiber_abwarten(
    mut schreiber: JoinHandle<()>,
    frist: Duration,
    key: ConnectionKey,
) -> bool {
    match tokio::time::timeout(frist, &mut schreiber).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(verbindung = %key, fehler = %e, "Schreib-Task abgebrochen");
            true
        }
        Err(_) => {
            schreiber.abort();
            tracing::warn!(
                verbindung = %key,
                frist_ms = frist.as_millis() as u64,
                "Schreib-Task haengt – abgebrochen"
            );
            false
        }
    }
}

async fn event_schreiben(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> SignalingResult<()> {
    let text = envelope::encode(event)?;
    ws_tx.send(Message::Text(text)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
