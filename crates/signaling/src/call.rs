//! Call-State-Machine – call / cancelCall / acceptCall / hangUp
//!
//! Jede Identity ist entweder frei oder in einem Anruf. Die Uebergaenge
//! betreffen immer beide Seiten einer Route und laufen atomar ueber die
//! Registry. Wer welchen Anruf fuehrt, wird nicht gespeichert; der Hub kennt
//! nur das Busy-Flag.
//!
//! ```text
//!   frei ──call──▶ in_call ──cancelCall / hangUp──▶ frei
//! ```
//!
//! `acceptCall` veraendert keinen Zustand, beide Seiten sind seit `call`
//! bereits belegt.
//!
//! Nach `call`, `cancelCall` und `hangUp` folgt ein Presence-Broadcast, nach
//! `acceptCall` nicht. Ein abgelehnter Uebergang wird still verworfen.

use signalhub_protocol::{Route, ServerEvent};

use crate::presence::PresenceBroadcaster;
use crate::registry::{PaarFehler, SessionRegistry};

// ---------------------------------------------------------------------------
// Ergebnis
// ---------------------------------------------------------------------------

/// Warum eine Call-Control-Nachricht nicht zugestellt wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerwerfGrund {
    /// `call` mit identischem Absender und Empfaenger
    SelbstAnruf,
    /// Eine Seite ist nicht registriert
    NichtRegistriert,
    /// Eine Seite ist bereits in einem Anruf
    Belegt,
    /// Zustand geaendert, Queue des Empfaengers hat nicht angenommen
    ZustellungFehlgeschlagen,
}

impl From<PaarFehler> for VerwerfGrund {
    fn from(fehler: PaarFehler) -> Self {
        match fehler {
            PaarFehler::NichtRegistriert => Self::NichtRegistriert,
            PaarFehler::Belegt => Self::Belegt,
        }
    }
}

/// Ausgang einer Call-Control-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Zugestellt,
    Verworfen(VerwerfGrund),
}

// ---------------------------------------------------------------------------
// CallStateMachine
// ---------------------------------------------------------------------------

/// Fuehrt Call-Control-Uebergaenge aus und benachrichtigt die Gegenseite
#[derive(Clone)]
pub struct CallStateMachine {
    registry: SessionRegistry,
    presence: PresenceBroadcaster,
}

impl CallStateMachine {
    pub fn neu(registry: SessionRegistry, presence: PresenceBroadcaster) -> Self {
        Self { registry, presence }
    }

    /// `call`: beide frei -> beide belegt, Empfaenger benachrichtigen
    pub fn anrufen(&self, route: Route) -> CallOutcome {
        if route.sender == route.receiver {
            return self.verwerfen("call", &route, VerwerfGrund::SelbstAnruf);
        }

        let empfaenger = match self.registry.paar_belegen(&route) {
            Ok(sender) => sender,
            Err(fehler) => return self.verwerfen("call", &route, fehler.into()),
        };

        tracing::info!(identitaet = %route.sender, peer = %route.receiver, "Anruf gestartet");
        let zugestellt = empfaenger.senden(ServerEvent::Call(route));
        self.presence.broadcast();
        Self::ergebnis(zugestellt)
    }

    /// `cancelCall`: beide zurueck auf frei, Empfaenger benachrichtigen
    pub fn abbrechen(&self, route: Route) -> CallOutcome {
        self.freigeben("cancelCall", route, ServerEvent::CancelCall)
    }

    /// `hangUp`: beide zurueck auf frei, Empfaenger benachrichtigen
    pub fn auflegen(&self, route: Route) -> CallOutcome {
        self.freigeben("hangUp", route, ServerEvent::HangUp)
    }

    /// `acceptCall`: nur weiterleiten, kein Zustandsuebergang, kein Broadcast
    pub fn annehmen(&self, route: Route) -> CallOutcome {
        let Some(empfaenger) = self.registry.sender_von(&route.receiver) else {
            return self.verwerfen("acceptCall", &route, VerwerfGrund::NichtRegistriert);
        };

        tracing::info!(identitaet = %route.sender, peer = %route.receiver, "Anruf angenommen");
        Self::ergebnis(empfaenger.senden(ServerEvent::AcceptCall(route)))
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn freigeben(
        &self,
        typ: &'static str,
        route: Route,
        event: fn(Route) -> ServerEvent,
    ) -> CallOutcome {
        let empfaenger = match self.registry.paar_freigeben(&route) {
            Ok(sender) => sender,
            Err(fehler) => return self.verwerfen(typ, &route, fehler.into()),
        };

        tracing::info!(typ, identitaet = %route.sender, peer = %route.receiver, "Anruf beendet");
        let zugestellt = empfaenger.senden(event(route));
        self.presence.broadcast();
        Self::ergebnis(zugestellt)
    }

    fn verwerfen(&self, typ: &'static str, route: &Route, grund: VerwerfGrund) -> CallOutcome {
        tracing::debug!(
            typ,
            identitaet = %route.sender,
            peer = %route.receiver,
            grund = ?grund,
            "Call-Control verworfen"
        );
        CallOutcome::Verworfen(grund)
    }

    fn ergebnis(zugestellt: bool) -> CallOutcome {
        if zugestellt {
            CallOutcome::Zugestellt
        } else {
            CallOutcome::Verworfen(VerwerfGrund::ZustellungFehlgeschlagen)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::ClientSender;
    use signalhub_core::{ConnectionKey, Identity};
    use tokio::sync::mpsc;

    struct Aufbau {
        registry: SessionRegistry,
        calls: CallStateMachine,
    }

    fn aufbau() -> Aufbau {
        let registry = SessionRegistry::neu();
        let presence = PresenceBroadcaster::neu(registry.clone());
        let calls = CallStateMachine::neu(registry.clone(), presence);
        Aufbau { registry, calls }
    }

    fn anmelden(registry: &SessionRegistry, name: &str) -> mpsc::Receiver<ServerEvent> {
        let (sender, rx) = ClientSender::neu(ConnectionKey::new(), 16);
        assert!(registry.beitreten(Identity::from(name), sender).ist_angenommen());
        rx
    }

    fn leeren(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn typen(events: &[ServerEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.typ()).collect()
    }

    fn belegt(registry: &SessionRegistry, name: &str) -> Option<bool> {
        registry.ist_belegt(&Identity::from(name))
    }

    #[test]
    fn anruf_belegt_beide_und_broadcastet() {
        let a = aufbau();
        let mut rx_alice = anmelden(&a.registry, "alice");
        let mut rx_bob = anmelden(&a.registry, "bob");

        assert_eq!(a.calls.anrufen(Route::new("alice", "bob")), CallOutcome::Zugestellt);
        assert_eq!(belegt(&a.registry, "alice"), Some(true));
        assert_eq!(belegt(&a.registry, "bob"), Some(true));

        assert_eq!(typen(&leeren(&mut rx_bob)), vec!["call", "activeUsers"]);
        assert_eq!(typen(&leeren(&mut rx_alice)), vec!["activeUsers"]);
    }

    #[test]
    fn anruf_auf_belegten_empfaenger_wird_verworfen() {
        let a = aufbau();
        let _rx_a = anmelden(&a.registry, "alice");
        let _rx_b = anmelden(&a.registry, "bob");
        let mut rx_carol = anmelden(&a.registry, "carol");

        a.calls.anrufen(Route::new("alice", "bob"));
        leeren(&mut rx_carol);

        assert_eq!(
            a.calls.anrufen(Route::new("carol", "bob")),
            CallOutcome::Verworfen(VerwerfGrund::Belegt)
        );
        assert_eq!(belegt(&a.registry, "carol"), Some(false));
        // Kein Broadcast bei verworfenem Anruf
        assert!(leeren(&mut rx_carol).is_empty());
    }

    #[test]
    fn anruf_an_unbekannten_empfaenger() {
        let a = aufbau();
        let mut rx_alice = anmelden(&a.registry, "alice");

        assert_eq!(
            a.calls.anrufen(Route::new("alice", "geist")),
            CallOutcome::Verworfen(VerwerfGrund::NichtRegistriert)
        );
        assert_eq!(belegt(&a.registry, "alice"), Some(false));
        assert!(leeren(&mut rx_alice).is_empty());
    }

    #[test]
    fn selbstanruf_wird_verworfen() {
        let a = aufbau();
        let mut rx_alice = anmelden(&a.registry, "alice");

        assert_eq!(
            a.calls.anrufen(Route::new("alice", "alice")),
            CallOutcome::Verworfen(VerwerfGrund::SelbstAnruf)
        );
        assert_eq!(belegt(&a.registry, "alice"), Some(false));
        assert!(leeren(&mut rx_alice).is_empty());
    }

    #[test]
    fn annehmen_ohne_zustandsaenderung_und_broadcast() {
        let a = aufbau();
        let mut rx_alice = anmelden(&a.registry, "alice");
        let mut rx_bob = anmelden(&a.registry, "bob");

        a.calls.anrufen(Route::new("alice", "bob"));
        leeren(&mut rx_alice);
        leeren(&mut rx_bob);

        assert_eq!(a.calls.annehmen(Route::new("bob", "alice")), CallOutcome::Zugestellt);
        assert_eq!(typen(&leeren(&mut rx_alice)), vec!["acceptCall"]);
        assert!(leeren(&mut rx_bob).is_empty());
        assert_eq!(belegt(&a.registry, "alice"), Some(true));
        assert_eq!(belegt(&a.registry, "bob"), Some(true));
    }

    #[test]
    fn annehmen_an_unbekannten_empfaenger() {
        let a = aufbau();
        let _rx_bob = anmelden(&a.registry, "bob");
        assert_eq!(
            a.calls.annehmen(Route::new("bob", "alice")),
            CallOutcome::Verworfen(VerwerfGrund::NichtRegistriert)
        );
    }

    #[test]
    fn auflegen_gibt_beide_frei() {
        let a = aufbau();
        let mut rx_alice = anmelden(&a.registry, "alice");
        let mut rx_bob = anmelden(&a.registry, "bob");

        a.calls.anrufen(Route::new("alice", "bob"));
        leeren(&mut rx_alice);
        leeren(&mut rx_bob);

        assert_eq!(a.calls.auflegen(Route::new("bob", "alice")), CallOutcome::Zugestellt);
        assert_eq!(belegt(&a.registry, "alice"), Some(false));
        assert_eq!(belegt(&a.registry, "bob"), Some(false));
        assert_eq!(typen(&leeren(&mut rx_alice)), vec!["hangUp", "activeUsers"]);
        assert_eq!(typen(&leeren(&mut rx_bob)), vec!["activeUsers"]);
    }

    #[test]
    fn abbrechen_gibt_beide_frei() {
        let a = aufbau();
        let _rx_alice = anmelden(&a.registry, "alice");
        let mut rx_bob = anmelden(&a.registry, "bob");

        a.calls.anrufen(Route::new("alice", "bob"));
        leeren(&mut rx_bob);

        assert_eq!(a.calls.abbrechen(Route::new("alice", "bob")), CallOutcome::Zugestellt);
        assert_eq!(belegt(&a.registry, "alice"), Some(false));
        assert_eq!(belegt(&a.registry, "bob"), Some(false));
        assert_eq!(typen(&leeren(&mut rx_bob)), vec!["cancelCall", "activeUsers"]);
    }

    #[test]
    fn auflegen_mit_getrennter_gegenseite() {
        let a = aufbau();
        let _rx_alice = anmelden(&a.registry, "alice");
        let (bob, _rx_bob) = ClientSender::neu(ConnectionKey::new(), 16);
        let bob_key = bob.key();
        a.registry.beitreten(Identity::from("bob"), bob);

        a.calls.anrufen(Route::new("alice", "bob"));
        a.registry.trennen(&bob_key);

        // Partner bleibt belegt, bis er selbst auflegt
        assert_eq!(belegt(&a.registry, "alice"), Some(true));
        assert_eq!(
            a.calls.auflegen(Route::new("alice", "bob")),
            CallOutcome::Verworfen(VerwerfGrund::NichtRegistriert)
        );
        assert_eq!(belegt(&a.registry, "alice"), Some(true));
    }

    #[test]
    fn auflegen_ohne_laufenden_anruf_ist_erlaubt() {
        let a = aufbau();
        let _rx_alice = anmelden(&a.registry, "alice");
        let mut rx_bob = anmelden(&a.registry, "bob");

        assert_eq!(a.calls.auflegen(Route::new("alice", "bob")), CallOutcome::Zugestellt);
        assert_eq!(typen(&leeren(&mut rx_bob)), vec!["hangUp", "activeUsers"]);
    }

    #[test]
    fn gleichzeitige_anrufe_letzter_snapshot_ist_aktuell() {
        use std::sync::{Arc, Barrier};

        for _ in 0..2000 {
            let a = aufbau();
            let mut rx_zuschauer = anmelden(&a.registry, "w");
            let _rx: Vec<_> = ["a", "b", "c", "d"]
                .into_iter()
                .map(|n| anmelden(&a.registry, n))
                .collect();

            let barriere = Arc::new(Barrier::new(2));
            let threads: Vec<_> = [("a", "b"), ("c", "d")]
                .into_iter()
                .map(|(von, an)| {
                    let calls = a.calls.clone();
                    let barriere = Arc::clone(&barriere);
                    std::thread::spawn(move || {
                        barriere.wait();
                        calls.anrufen(Route::new(von, an))
                    })
                })
                .collect();
            for t in threads {
                assert_eq!(t.join().unwrap(), CallOutcome::Zugestellt);
            }

            let letzter = leeren(&mut rx_zuschauer)
                .into_iter()
                .filter_map(|e| match e {
                    ServerEvent::ActiveUsers(users) => Some(users),
                    _ => None,
                })
                .last()
                .expect("Snapshot erwartet");
            assert_eq!(letzter, a.registry.snapshot());
            assert!(letzter.iter().filter(|u| u.name.as_str() != "w").all(|u| u.in_call));
        }
    }
}
