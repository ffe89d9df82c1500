//! Presence-Broadcaster – Verteilt den Snapshot aller registrierten Identities
//!
//! Nach jeder Aenderung an Registrierung oder Busy-Status wird der komplette
//! Snapshot an jede registrierte Verbindung geschickt. Die Clients ersetzen
//! ihre Liste damit vollstaendig.

use signalhub_protocol::ServerEvent;

use crate::registry::SessionRegistry;

// ---------------------------------------------------------------------------
// PresenceBroadcaster
// ---------------------------------------------------------------------------

/// Sendet `activeUsers` an alle registrierten Sessions
///
/// Clone teilt die Registry.
#[derive(Clone)]
pub struct PresenceBroadcaster {
    registry: SessionRegistry,
}

impl PresenceBroadcaster {
    pub fn neu(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Schickt den aktuellen Snapshot an jede registrierte Session
    ///
    /// Snapshot lesen und Einreihen passieren im selben Lesezugriff. Zwei
    /// gleichzeitige Aenderungen koennen ihre Snapshots so nicht vertauscht
    /// einreihen; der zuletzt eingereihte Snapshot entspricht immer dem
    /// aktuellen Zustand. `senden` nutzt `try_send` und blockiert nie. Eine
    /// volle oder geschlossene Queue betrifft nur diesen einen Empfaenger.
    ///
    /// Gibt die Anzahl erfolgreich eingereihter Nachrichten zurueck.
    pub fn broadcast(&self) -> usize {
        let (anzahl, zugestellt) = self.registry.snapshot_verteilen(|users, empfaenger| {
            let event = ServerEvent::ActiveUsers(users);
            let zugestellt = empfaenger
                .iter()
                .filter(|sender| sender.senden(event.clone()))
                .count();
            (empfaenger.len(), zugestellt)
        });

        tracing::debug!(empfaenger = anzahl, zugestellt, "Presence-Snapshot verteilt");
        zugestellt
    }

    /// Aktueller Snapshot als Event, ohne ihn zu verteilen
    pub fn snapshot_event(&self) -> ServerEvent {
        ServerEvent::ActiveUsers(self.registry.snapshot())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
