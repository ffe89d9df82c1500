//! signalhub-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use signalhub_signaling::{SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bindet den Listener, nimmt aber noch keine Verbindungen an
    ///
    /// Mit Port 0 vergibt das Betriebssystem einen freien Port, abrufbar
    /// ueber `LaufenderServer::lokale_adresse`.
    pub async fn binden(self) -> Result<LaufenderServer> {
        let adresse = self.config.bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Listener auf {adresse} konnte nicht gebunden werden"))?;
        let lokale_adresse = listener.local_addr()?;

        let state = SignalingState::neu(self.config.signaling_config());

        Ok(LaufenderServer {
            config: self.config,
            listener,
            lokale_adresse,
            state,
        })
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal (Ctrl-C)
    pub async fn starten(self) -> Result<()> {
        let laufend = self.binden().await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
            }
            let _ = shutdown_tx.send(true);
        });

        laufend.laufen(shutdown_rx).await
    }
}

/// Gebundener Server, bereit zum Annehmen von Verbindungen
pub struct LaufenderServer {
    config: ServerConfig,
    listener: TcpListener,
    lokale_adresse: SocketAddr,
    state: Arc<SignalingState>,
}

impl LaufenderServer {
    /// Tatsaechlich gebundene Adresse
    pub fn lokale_adresse(&self) -> SocketAddr {
        self.lokale_adresse
    }

    /// Gemeinsamer Hub-Zustand (fuer Tests und Diagnose)
    pub fn state(&self) -> Arc<SignalingState> {
        Arc::clone(&self.state)
    }

    /// Nimmt Verbindungen an, bis `shutdown_rx` `true` meldet
    pub async fn laufen(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %self.lokale_adresse,
            pfad = %self.config.netzwerk.pfad,
            "Server startet"
        );

        SignalingServer::neu(self.state)
            .starten(self.listener, shutdown_rx)
            .await
            .context("Signaling-Server beendet mit Fehler")?;

        tracing::info!("Server gestoppt");
        Ok(())
    }
}
