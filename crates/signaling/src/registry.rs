//! Session-Registry – Wer ist unter welchem Namen verbunden?
//!
//! Haelt die Vorwaerts-Map (Identity -> Session) und die Rueckwaerts-Map
//! (ConnectionKey -> Identity) hinter einem einzigen RwLock. Die Maps
//! verlassen dieses Modul nie; alle Aufrufer gehen ueber die atomaren
//! Operationen unten.
//!
//! ## Invarianten (gelten nach jeder Mutation)
//! 1. Jede Session hat ein Sender-Handle.
//! 2. Die Rueckwaerts-Map enthaelt genau die Schluessel der aktuellen
//!    Session-Verbindungen, keine weiteren.
//! 3. Keine Identity hat zwei lebende Handles gleichzeitig.

use parking_lot::RwLock;
use signalhub_core::{ConnectionKey, Identity};
use signalhub_protocol::{ActiveUser, Route};
use std::collections::HashMap;
use std::sync::Arc;

use crate::sender::ClientSender;

// ---------------------------------------------------------------------------
// Ergebnistypen
// ---------------------------------------------------------------------------

/// Ergebnis einer Join-Anfrage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinErgebnis {
    /// Session angelegt
    Angenommen {
        /// Eine veraltete Session mit demselben Namen wurde ersetzt
        ersetzt: bool,
        /// Die Verbindung war vorher unter diesem Namen gebunden
        freigegeben: Option<Identity>,
    },
    /// Der Name hat bereits eine lebende Session
    Abgelehnt,
}

impl JoinErgebnis {
    pub fn ist_angenommen(&self) -> bool {
        matches!(self, Self::Angenommen { .. })
    }
}

/// Grund, warum ein Paar-Uebergang nicht stattfand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaarFehler {
    /// Mindestens eine Seite ist nicht registriert
    NichtRegistriert,
    /// Mindestens eine Seite ist bereits in einem Anruf
    Belegt,
}

// ---------------------------------------------------------------------------
// Interner Zustand
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Session {
    sender: ClientSender,
    in_call: bool,
}

#[derive(Debug, Default)]
struct RegistryInner {
    sessions: HashMap<Identity, Session>,
    verbindungen: HashMap<ConnectionKey, Identity>,
}

impl RegistryInner {
    /// Entfernt eine Session samt aller Rueckwaerts-Eintraege auf sie
    fn session_entfernen(&mut self, identity: &Identity) -> Option<Session> {
        let session = self.sessions.remove(identity)?;
        self.verbindungen.retain(|_, name| name != identity);
        Some(session)
    }

    fn snapshot(&self) -> Vec<ActiveUser> {
        let mut users: Vec<ActiveUser> = self
            .sessions
            .iter()
            .map(|(name, session)| ActiveUser {
                name: name.clone(),
                in_call: session.in_call,
            })
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Autoritative Zuordnung Identity <-> Verbindung inklusive Busy-Flag
///
/// Thread-safe via Arc + RwLock. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl SessionRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Bindet `identity` an die Verbindung hinter `sender`
    ///
    /// - Kein Eintrag: Session anlegen.
    /// - Eintrag mit lebendem Handle: ablehnen, nichts veraendern.
    /// - Eintrag mit geschlossenem Handle: veraltete Session ersetzen.
    ///
    /// War die Verbindung bereits unter einem anderen Namen gebunden, wird
    /// dieser zuerst freigegeben, damit sie nie zwei Namen traegt.
    pub fn beitreten(&self, identity: Identity, sender: ClientSender) -> JoinErgebnis {
        let key = sender.key();
        let mut inner = self.inner.write();

        let bestehend_veraltet = inner
            .sessions
            .get(&identity)
            .map(|s| s.sender.ist_geschlossen());
        let ersetzt = match bestehend_veraltet {
            Some(false) => return JoinErgebnis::Abgelehnt,
            Some(true) => {
                inner.session_entfernen(&identity);
                true
            }
            None => false,
        };

        let freigegeben = inner.verbindungen.get(&key).cloned();
        if let Some(alt) = &freigegeben {
            inner.session_entfernen(alt);
        }

        inner.verbindungen.insert(key, identity.clone());
        inner.sessions.insert(
            identity,
            Session {
                sender,
                in_call: false,
            },
        );

        JoinErgebnis::Angenommen {
            ersetzt,
            freigegeben,
        }
    }

    /// Loest die Bindung der Verbindung `key`
    ///
    /// Gibt die freigegebene Identity zurueck. Unbekannte Schluessel sind
    /// kein Fehler.
    pub fn trennen(&self, key: &ConnectionKey) -> Option<Identity> {
        let mut inner = self.inner.write();
        let identity = inner.verbindungen.remove(key)?;
        inner.sessions.remove(&identity);
        Some(identity)
    }

    /// Setzt beide Seiten atomar auf `in_call`, wenn beide registriert und frei sind
    ///
    /// Gibt das Handle des Empfaengers zurueck. Pruefen und Setzen laufen im
    /// selben exklusiven Abschnitt, zwei gleichzeitige Anrufe auf dieselbe
    /// Person koennen also nicht beide gelingen.
    pub fn paar_belegen(&self, route: &Route) -> Result<ClientSender, PaarFehler> {
        let mut inner = self.inner.write();

        let anrufer = inner.sessions.get(&route.sender).map(|s| s.in_call);
        let ziel = inner
            .sessions
            .get(&route.receiver)
            .map(|s| (s.in_call, s.sender.clone()));

        match (anrufer, ziel) {
            (Some(false), Some((false, empfaenger))) => {
                for name in [&route.sender, &route.receiver] {
                    if let Some(session) = inner.sessions.get_mut(name) {
                        session.in_call = true;
                    }
                }
                Ok(empfaenger)
            }
            (None, _) | (_, None) => Err(PaarFehler::NichtRegistriert),
            _ => Err(PaarFehler::Belegt),
        }
    }

    /// Setzt beide Seiten atomar zurueck auf frei, wenn beide registriert sind
    pub fn paar_freigeben(&self, route: &Route) -> Result<ClientSender, PaarFehler> {
        let mut inner = self.inner.write();

        if !inner.sessions.contains_key(&route.sender) {
            return Err(PaarFehler::NichtRegistriert);
        }
        let empfaenger = match inner.sessions.get(&route.receiver) {
            Some(session) => session.sender.clone(),
            None => return Err(PaarFehler::NichtRegistriert),
        };

        for name in [&route.sender, &route.receiver] {
            if let Some(session) = inner.sessions.get_mut(name) {
                session.in_call = false;
            }
        }
        Ok(empfaenger)
    }

    /// Handle der Session von `identity`, falls registriert
    pub fn sender_von(&self, identity: &Identity) -> Option<ClientSender> {
        self.inner
            .read()
            .sessions
            .get(identity)
            .map(|s| s.sender.clone())
    }

    /// Identity, an die die Verbindung `key` gebunden ist
    pub fn identitaet_von(&self, key: &ConnectionKey) -> Option<Identity> {
        self.inner.read().verbindungen.get(key).cloned()
    }

    /// Busy-Flag von `identity`, `None` wenn nicht registriert
    pub fn ist_belegt(&self, identity: &Identity) -> Option<bool> {
        self.inner.read().sessions.get(identity).map(|s| s.in_call)
    }

    /// Alle registrierten Identities mit Busy-Flag, nach Namen sortiert
    pub fn snapshot(&self) -> Vec<ActiveUser> {
        self.inner.read().snapshot()
    }

    /// Ruft `verteilen` mit Snapshot und Handles aller Sessions auf, solange
    /// der Lesezugriff gehalten wird
    ///
    /// Schreibende Operationen warten, bis `verteilen` fertig ist. Ein
    /// Snapshot ist damit bei allen Empfaengern eingereiht, bevor sich der
    /// Zustand erneut aendern kann. `verteilen` darf nicht blockieren und
    /// nicht auf die Registry zugreifen.
    pub fn snapshot_verteilen<R>(
        &self,
        verteilen: impl FnOnce(Vec<ActiveUser>, Vec<&ClientSender>) -> R,
    ) -> R {
        let inner = self.inner.read();
        let empfaenger = inner.sessions.values().map(|s| &s.sender).collect();
        verteilen(inner.snapshot(), empfaenger)
    }

    /// Anzahl der registrierten Sessions
    pub fn anzahl(&self) -> usize {
        self.inner.read().sessions.len()
    }

    #[cfg(test)]
    fn invarianten_pruefen(&self) {
        let inner = self.inner.read();
        assert_eq!(
            inner.sessions.len(),
            inner.verbindungen.len(),
            "Jede Session braucht genau einen Rueckwaerts-Eintrag"
        );
        for (name, session) in &inner.sessions {
            assert_eq!(
                inner.verbindungen.get(&session.sender.key()),
                Some(name),
                "Rueckwaerts-Eintrag fehlt oder zeigt auf falsche Identity"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use signalhub_protocol::ServerEvent;
    use std::sync::Barrier;
    use tokio::sync::mpsc;

    fn client() -> (ClientSender, mpsc::Receiver<ServerEvent>) {
        ClientSender::neu(ConnectionKey::new(), 16)
    }

    fn name(n: &str) -> Identity {
        Identity::from(n)
    }

    #[test]
    fn beitreten_und_trennen() {
        let reg = SessionRegistry::neu();
        let (alice, _rx) = client();
        let key = alice.key();

        assert!(reg.beitreten(name("alice"), alice).ist_angenommen());
        assert_eq!(reg.anzahl(), 1);
        assert_eq!(reg.identitaet_von(&key), Some(name("alice")));
        reg.invarianten_pruefen();

        assert_eq!(reg.trennen(&key), Some(name("alice")));
        assert_eq!(reg.anzahl(), 0);
        assert_eq!(reg.identitaet_von(&key), None);
        reg.invarianten_pruefen();
    }

    #[test]
    fn doppelter_name_wird_abgelehnt() {
        let reg = SessionRegistry::neu();
        let (erste, _rx1) = client();
        let (zweite, _rx2) = client();
        let erster_key = erste.key();

        assert!(reg.beitreten(name("alice"), erste).ist_angenommen());
        assert_eq!(reg.beitreten(name("alice"), zweite.clone()), JoinErgebnis::Abgelehnt);

        // Erste Session bleibt unberuehrt
        assert_eq!(reg.identitaet_von(&erster_key), Some(name("alice")));
        assert_eq!(reg.identitaet_von(&zweite.key()), None);
        assert_eq!(reg.snapshot().len(), 1);
        reg.invarianten_pruefen();
    }

    #[test]
    fn gleicher_name_von_gleicher_verbindung_wird_abgelehnt() {
        let reg = SessionRegistry::neu();
        let (alice, _rx) = client();

        assert!(reg.beitreten(name("alice"), alice.clone()).ist_angenommen());
        assert_eq!(reg.beitreten(name("alice"), alice), JoinErgebnis::Abgelehnt);
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn name_nach_trennen_wieder_frei() {
        let reg = SessionRegistry::neu();
        let (erste, _rx1) = client();
        let (zweite, _rx2) = client();
        let erster_key = erste.key();

        reg.beitreten(name("alice"), erste);
        reg.trennen(&erster_key);

        assert_eq!(
            reg.beitreten(name("alice"), zweite),
            JoinErgebnis::Angenommen {
                ersetzt: false,
                freigegeben: None
            }
        );
        reg.invarianten_pruefen();
    }

    #[test]
    fn veraltete_session_wird_ersetzt() {
        let reg = SessionRegistry::neu();
        let (alt, alt_rx) = client();
        let (neu, _rx) = client();
        let alt_key = alt.key();

        reg.beitreten(name("alice"), alt);
        // Schreib-Task der alten Verbindung ist weg
        drop(alt_rx);

        assert_eq!(
            reg.beitreten(name("alice"), neu.clone()),
            JoinErgebnis::Angenommen {
                ersetzt: true,
                freigegeben: None
            }
        );
        assert_eq!(reg.identitaet_von(&alt_key), None);
        assert_eq!(reg.identitaet_von(&neu.key()), Some(name("alice")));
        reg.invarianten_pruefen();

        // Spaetes Trennen der alten Verbindung trifft die neue Session nicht
        assert_eq!(reg.trennen(&alt_key), None);
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn umbenennen_gibt_alten_namen_frei() {
        let reg = SessionRegistry::neu();
        let (verbindung, _rx) = client();

        reg.beitreten(name("alice"), verbindung.clone());
        let ergebnis = reg.beitreten(name("alicia"), verbindung.clone());

        assert_eq!(
            ergebnis,
            JoinErgebnis::Angenommen {
                ersetzt: false,
                freigegeben: Some(name("alice"))
            }
        );
        assert_eq!(reg.identitaet_von(&verbindung.key()), Some(name("alicia")));
        assert!(reg.sender_von(&name("alice")).is_none());
        reg.invarianten_pruefen();
    }

    #[test]
    fn trennen_unbekannter_verbindung_ist_noop() {
        let reg = SessionRegistry::neu();
        let (alice, _rx) = client();
        reg.beitreten(name("alice"), alice);

        assert_eq!(reg.trennen(&ConnectionKey::new()), None);
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn paar_belegen_und_freigeben() {
        let reg = SessionRegistry::neu();
        let (alice, _rx1) = client();
        let (bob, _rx2) = client();
        let bob_key = bob.key();
        reg.beitreten(name("alice"), alice);
        reg.beitreten(name("bob"), bob);

        let route = Route::new("alice", "bob");
        let empfaenger = reg.paar_belegen(&route).expect("Beide frei");
        assert_eq!(empfaenger.key(), bob_key);
        assert_eq!(reg.ist_belegt(&name("alice")), Some(true));
        assert_eq!(reg.ist_belegt(&name("bob")), Some(true));

        // Zweiter Anruf scheitert solange beide belegt sind
        assert_eq!(reg.paar_belegen(&route).unwrap_err(), PaarFehler::Belegt);

        reg.paar_freigeben(&Route::new("bob", "alice")).expect("Beide registriert");
        assert_eq!(reg.ist_belegt(&name("alice")), Some(false));
        assert_eq!(reg.ist_belegt(&name("bob")), Some(false));
    }

    #[test]
    fn paar_mit_unbekannter_seite() {
        let reg = SessionRegistry::neu();
        let (alice, _rx) = client();
        reg.beitreten(name("alice"), alice);

        let route = Route::new("alice", "niemand");
        assert_eq!(reg.paar_belegen(&route).unwrap_err(), PaarFehler::NichtRegistriert);
        assert_eq!(reg.paar_freigeben(&route).unwrap_err(), PaarFehler::NichtRegistriert);
        // Keine Teil-Mutation
        assert_eq!(reg.ist_belegt(&name("alice")), Some(false));
    }

    #[test]
    fn snapshot_ist_sortiert_und_traegt_busy_flags() {
        let reg = SessionRegistry::neu();
        let mut empfaenger = Vec::new();
        for n in ["carol", "alice", "bob"] {
            let (sender, rx) = client();
            empfaenger.push(rx);
            reg.beitreten(name(n), sender);
        }
        reg.paar_belegen(&Route::new("alice", "carol")).unwrap();

        let snapshot = reg.snapshot();
        let namen: Vec<&str> = snapshot.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(namen, vec!["alice", "bob", "carol"]);
        let busy: Vec<bool> = snapshot.iter().map(|u| u.in_call).collect();
        assert_eq!(busy, vec![true, false, true]);

        let anzahl = reg.snapshot_verteilen(|users, handles| {
            assert_eq!(users, snapshot);
            handles.len()
        });
        assert_eq!(anzahl, 3);
    }

    #[test]
    fn gleichzeitige_anrufe_hoechstens_einer_gelingt() {
        for _ in 0..200 {
            let reg = SessionRegistry::neu();
            let mut empfaenger = Vec::new();
            for n in ["a", "b", "c"] {
                let (sender, rx) = client();
                empfaenger.push(rx);
                reg.beitreten(name(n), sender);
            }

            let barriere = Arc::new(Barrier::new(2));
            let threads: Vec<_> = ["b", "c"]
                .into_iter()
                .map(|ziel| {
                    let reg = reg.clone();
                    let barriere = Arc::clone(&barriere);
                    std::thread::spawn(move || {
                        barriere.wait();
                        reg.paar_belegen(&Route::new("a", ziel)).is_ok()
                    })
                })
                .collect();

            let erfolge = threads
                .into_iter()
                .map(|t| t.join().unwrap())
                .filter(|ok| *ok)
                .count();
            assert_eq!(erfolge, 1, "Genau ein Anruf darf gelingen");

            let belegt = ["b", "c"]
                .iter()
                .filter(|n| reg.ist_belegt(&name(n)) == Some(true))
                .count();
            assert_eq!(belegt, 1);
            reg.invarianten_pruefen();
        }
    }

    #[test]
    fn nebenlaeufiges_beitreten_ein_gewinner() {
        let reg = SessionRegistry::neu();
        let barriere = Arc::new(Barrier::new(8));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                let barriere = Arc::clone(&barriere);
                std::thread::spawn(move || {
                    let (sender, rx) = client();
                    barriere.wait();
                    let ok = reg.beitreten(name("alice"), sender).ist_angenommen();
                    (ok, rx)
                })
            })
            .collect();

        let ergebnisse: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(ergebnisse.iter().filter(|(ok, _)| *ok).count(), 1);
        assert_eq!(reg.anzahl(), 1);
        reg.invarianten_pruefen();
    }
}
