//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, die Werte aus der Konfigurations-
//! datei werden dabei ueberschrieben:
//! - `SH_LOG_LEVEL`: Filter im EnvFilter-Format (z.B. `info` oder
//!   `signalhub_signaling=debug,info`), Standard: info
//! - `SH_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Felder, die ueberall gleich heissen: `identitaet`, `verbindung`, `peer`.

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "SH_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "SH_LOG_FORMAT";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parst `text` / `json`, unbekannte Werte fallen auf Text zurueck
    pub fn aus_str(format: &str) -> Self {
        match format {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Fehler beim Initialisieren des Loggings
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Ungueltiger Log-Filter '{filter}': {grund}")]
    UngueltigerFilter { filter: String, grund: String },

    #[error("Globaler Subscriber bereits gesetzt: {0}")]
    BereitsInitialisiert(String),
}

/// Initialisiert das Logging-System.
///
/// `SH_LOG_LEVEL` und `SH_LOG_FORMAT` haben Vorrang vor `level` und
/// `format`. Darf pro Prozess nur einmal erfolgreich aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<(), LoggingError> {
    let filter_text = filter_waehlen(std::env::var(ENV_LOG_LEVEL).ok(), level);
    let filter =
        EnvFilter::try_new(&filter_text).map_err(|e| LoggingError::UngueltigerFilter {
            filter: filter_text.clone(),
            grund: e.to_string(),
        })?;

    let format = LogFormat::aus_str(&filter_waehlen(std::env::var(ENV_LOG_FORMAT).ok(), format));

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| LoggingError::BereitsInitialisiert(e.to_string()))
}

/// Umgebungswert vor Konfigurationswert, leere Werte zaehlen nicht
fn filter_waehlen(env: Option<String>, konfiguriert: &str) -> String {
    match env {
        Some(wert) if !wert.trim().is_empty() => wert,
        _ if konfiguriert.trim().is_empty() => "info".to_string(),
        _ => konfiguriert.to_string(),
    }
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
