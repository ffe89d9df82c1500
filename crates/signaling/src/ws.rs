//! WebSocket-Listener – Nimmt Upgrades an und startet Verbindungs-Tasks
//!
//! Der `SignalingServer` stellt genau eine Route bereit (Standard
//! `/signal`). Jedes erfolgreiche Upgrade bekommt eine eigene
//! `ClientConnection`, alle Verbindungen laufen echt parallel auf der
//! Multi-Thread-Runtime.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// State der Upgrade-Route
#[derive(Clone)]
struct WsState {
    state: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// WebSocket-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Baut den axum-Router mit der Upgrade-Route
    pub fn router(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        let pfad = self.state.config.pfad.clone();
        Router::new()
            .route(&pfad, get(ws_upgrade))
            .layer(TraceLayer::new_for_http())
            .with_state(WsState {
                state: Arc::clone(&self.state),
                shutdown_rx,
            })
    }

    /// Nimmt Verbindungen auf `listener` an
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt. Offene
    /// Verbindungen sehen dasselbe Signal und schliessen sich selbst.
    pub async fn starten(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = listener.local_addr()?;
        let app = self.router(shutdown_rx.clone());

        tracing::info!(
            adresse = %lokale_addr,
            pfad = %self.state.config.pfad,
            "WebSocket Signaling-Server gestartet"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_abwarten(shutdown_rx))
        .await?;

        tracing::info!("WebSocket Signaling-Server gestoppt");
        Ok(())
    }
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(ws_state): State<WsState>,
) -> Response {
    let max_bytes = ws_state.state.config.max_nachricht_bytes;
    let verbindung = ClientConnection::neu(Arc::clone(&ws_state.state), peer_addr);
    let shutdown_rx = ws_state.shutdown_rx.clone();

    tracing::debug!(peer = %peer_addr, verbindung = %verbindung.key(), "WebSocket-Upgrade");

    ws.max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}

/// Wartet bis das Shutdown-Signal `true` ist oder der Sender wegfaellt
async fn shutdown_abwarten(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
