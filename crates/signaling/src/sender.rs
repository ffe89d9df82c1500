//! Client-Sender – Handle auf die Send-Queue einer Verbindung
//!
//! Jede Verbindung besitzt genau eine begrenzte mpsc-Queue, die von genau
//! einem Schreib-Task geleert wird. Nur dieser Task schreibt auf den Socket.
//! Damit duerfen beliebig viele Stellen (Weiterleitung, Presence-Broadcast,
//! direkte Antworten) gleichzeitig an dieselbe Verbindung senden, ohne dass
//! sich Frames auf dem Transport vermischen. Der Hub verlaesst sich auf
//! diese Eigenschaft.

use signalhub_core::ConnectionKey;
use signalhub_protocol::ServerEvent;
use tokio::sync::mpsc;

/// Standardgroesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Handle auf die Send-Queue einer verbundenen Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    key: ConnectionKey,
    tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Erstellt Handle und zugehoerige Empfangsseite fuer den Schreib-Task
    pub fn neu(key: ConnectionKey, groesse: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self { key, tx }, rx)
    }

    /// Schluessel der Verbindung, zu der diese Queue gehoert
    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    /// Reiht ein Event nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist. Der
    /// Fehler wird hier geloggt und nicht weitergereicht.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    verbindung = %self.key,
                    typ = event.typ(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::debug!(
                    verbindung = %self.key,
                    typ = event.typ(),
                    "Send-Queue geschlossen (Schreib-Task beendet)"
                );
                false
            }
        }
    }

    /// Der Schreib-Task existiert nicht mehr, das Handle ist veraltet
    pub fn ist_geschlossen(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
