//! Message-Router – Leitet offer/answer/candidate an den Empfaenger weiter
//!
//! Der Router prueft weder Busy-Status noch Inhalt. Ist der Empfaenger
//! nicht registriert, wird die Nachricht still verworfen; der Absender
//! erfaehrt davon nichts.

use signalhub_protocol::{RelayKind, RelayPayload};

use crate::registry::SessionRegistry;

/// Ergebnis einer Weiterleitung (nur fuer Logs und Tests)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zustellung {
    /// In die Queue des Empfaengers eingereiht
    Zugestellt,
    /// Empfaenger unbekannt oder Queue nicht annehmend
    Verworfen,
}

/// Punkt-zu-Punkt-Weiterleitung anhand des Empfaengernamens
#[derive(Clone)]
pub struct MessageRouter {
    registry: SessionRegistry,
}

impl MessageRouter {
    pub fn neu(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Leitet `relay` unveraendert als `kind` an `relay.route.receiver` weiter
    pub fn weiterleiten(&self, kind: RelayKind, relay: RelayPayload) -> Zustellung {
        let Some(empfaenger) = self.registry.sender_von(&relay.route.receiver) else {
            tracing::debug!(
                typ = %kind,
                identitaet = %relay.route.sender,
                peer = %relay.route.receiver,
                "Empfaenger nicht registriert – Weiterleitung verworfen"
            );
            return Zustellung::Verworfen;
        };

        let sender = relay.route.sender.clone();
        let receiver = relay.route.receiver.clone();
        if empfaenger.senden(kind.event(relay)) {
            tracing::trace!(typ = %kind, identitaet = %sender, peer = %receiver, "Weitergeleitet");
            Zustellung::Zugestellt
        } else {
            Zustellung::Verworfen
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
