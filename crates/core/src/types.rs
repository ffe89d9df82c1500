//! Gemeinsame Identifikationstypen fuer den Signal-Hub
//!
//! Beide IDs verwenden das Newtype-Pattern, damit ein Anzeigename nie mit
//! einem Verbindungsschluessel verwechselt werden kann.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vom Benutzer gewaehlter Anzeigename
///
/// Wird nicht auf ein Format geprueft. Eindeutig nur innerhalb der aktuell
/// registrierten Sessions, nach dem Trennen wieder frei.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Erstellt eine Identity aus einem beliebigen Namen
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Gibt den Namen als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaker Schluessel einer physischen Verbindung
///
/// Wird beim Annehmen der Verbindung vergeben und dient ausschliesslich
/// der Rueckwaertssuche "Verbindung -> gebundene Identity".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionKey(pub Uuid);

impl ConnectionKey {
    /// Erstellt einen neuen zufaelligen Schluessel
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}
