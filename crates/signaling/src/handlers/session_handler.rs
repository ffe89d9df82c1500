//! Session-Handler – join, leave, activeUsers und Verbindungsende
//!
//! Alles, was die Mitgliedschaft in der Registry veraendert oder abfragt.

use signalhub_core::Identity;
use signalhub_protocol::ServerEvent;

use crate::dispatcher::DispatcherContext;
use crate::registry::JoinErgebnis;
use crate::server_state::SignalingState;

/// Verarbeitet `join`
///
/// Das Ergebnis geht immer nur an die anfragende Verbindung und wird vor
/// dem Presence-Broadcast dieses Joins eingereiht.
pub fn handle_join(name: Identity, ctx: &DispatcherContext, state: &SignalingState) -> bool {
    let ergebnis = state.registry.beitreten(name.clone(), ctx.sender.clone());
    let angenommen = ergebnis.ist_angenommen();

    match &ergebnis {
        JoinErgebnis::Angenommen {
            ersetzt,
            freigegeben,
        } => {
            tracing::info!(
                identitaet = %name,
                verbindung = %ctx.key,
                peer = %ctx.peer_addr,
                ersetzt,
                vorher = freigegeben.as_ref().map(Identity::as_str),
                "Identity registriert"
            );
        }
        JoinErgebnis::Abgelehnt => {
            tracing::warn!(
                identitaet = %name,
                verbindung = %ctx.key,
                "Join abgelehnt – Name bereits vergeben"
            );
        }
    }

    ctx.sender.senden(ServerEvent::JoinResult {
        receiver: name,
        result: angenommen,
    });

    if angenommen {
        state.presence.broadcast();
    }
    angenommen
}

/// Verarbeitet `leave`: Identity freigeben, Verbindung bleibt offen
pub fn handle_leave(ctx: &DispatcherContext, state: &SignalingState) {
    match state.registry.trennen(&ctx.key) {
        Some(identity) => {
            tracing::info!(identitaet = %identity, verbindung = %ctx.key, "Identity abgemeldet");
            state.presence.broadcast();
        }
        None => {
            tracing::debug!(verbindung = %ctx.key, "leave ohne gebundene Identity");
        }
    }
}

/// Verarbeitet `activeUsers`: Snapshot nur an die anfragende Verbindung
pub fn handle_active_users(ctx: &DispatcherContext, state: &SignalingState) {
    ctx.sender.senden(state.presence.snapshot_event());
}

/// Raeumt nach dem Ende einer Verbindung auf
///
/// Laeuft genau einmal pro Verbindung. War keine Identity gebunden, passiert
/// nichts und es wird auch nichts verteilt.
pub fn handle_disconnect(ctx: &DispatcherContext, state: &SignalingState) -> Option<Identity> {
    let identity = state.registry.trennen(&ctx.key)?;
    tracing::info!(
        identitaet = %identity,
        verbindung = %ctx.key,
        peer = %ctx.peer_addr,
        "Identity nach Verbindungsende entfernt"
    );
    state.presence.broadcast();
    Some(identity)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
