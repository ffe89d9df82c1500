//! Fehlertypen fuer den Signaling-Service
//!
//! Keiner dieser Fehler beendet den Hub oder andere Verbindungen. Sie werden
//! an der Stelle, an der sie entstehen, geloggt und verworfen.

use signalhub_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Listener, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Eingehender Frame verletzt das Protokoll (unbekannter Typ, kaputter Umschlag)
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtocolError),

    /// Ausgehendes Event konnte nicht kodiert werden
    #[error("Kodierungsfehler: {0}")]
    Kodierung(#[from] serde_json::Error),

    /// Schreiben auf den WebSocket fehlgeschlagen
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] axum::Error),

    /// Binaerframes sind im Signaling-Protokoll nicht vorgesehen
    #[error("Binaerframe mit {0} Bytes nicht unterstuetzt")]
    BinaerFrame(usize),

    /// Client hat einen Close-Frame geschickt
    #[error("Verbindung vom Client geschlossen")]
    VerbindungGeschlossen,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
