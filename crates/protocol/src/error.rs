//! Fehlertypen fuer das Dekodieren von Nachrichten

use thiserror::Error;

/// Fehler beim Dekodieren eines eingehenden Umschlags
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Kein gueltiges JSON oder falsche Feldtypen
    #[error("Ungueltiger Umschlag: {0}")]
    Json(#[from] serde_json::Error),

    /// `type` ist keiner der bekannten Nachrichtentypen
    #[error("Unbekannter Nachrichtentyp: {0}")]
    UnbekannterTyp(String),

    /// Ein fuer diesen Typ notwendiges Feld fehlt oder ist leer
    #[error("Feld '{feld}' fehlt fuer Nachrichtentyp '{typ}'")]
    FeldFehlt {
        typ: &'static str,
        feld: &'static str,
    },
}

/// Result-Typ fuer das Protokoll-Crate
pub type ProtocolResult<T> = Result<T, ProtocolError>;
