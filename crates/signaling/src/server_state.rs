//! Gemeinsamer Server-Zustand fuer den Signal-Hub
//!
//! Haelt Registry, Broadcaster, Router und Call-State-Machine. Alle teilen
//! dieselbe `SessionRegistry`, es gibt genau einen gemeinsamen Zustand.

use std::sync::Arc;

use crate::call::CallStateMachine;
use crate::presence::PresenceBroadcaster;
use crate::registry::SessionRegistry;
use crate::router::MessageRouter;
use crate::sender::SEND_QUEUE_GROESSE;

/// Standardgrenze fuer eingehende Nachrichten (64 KiB)
pub const MAX_NACHRICHT_BYTES: usize = 64 * 1024;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// HTTP-Pfad, unter dem die WebSocket-Verbindung angenommen wird
    pub pfad: String,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Maximale Groesse einer eingehenden Nachricht in Bytes
    pub max_nachricht_bytes: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            pfad: "/signal".to_string(),
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_nachricht_bytes: MAX_NACHRICHT_BYTES,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Service-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Identity <-> Verbindung, Busy-Flags
    pub registry: SessionRegistry,
    /// `activeUsers` an alle
    pub presence: PresenceBroadcaster,
    /// offer / answer / candidate
    pub router: MessageRouter,
    /// call / cancelCall / acceptCall / hangUp
    pub calls: CallStateMachine,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState mit leerer Registry
    pub fn neu(config: SignalingConfig) -> Arc<Self> {
        let registry = SessionRegistry::neu();
        let presence = PresenceBroadcaster::neu(registry.clone());
        let router = MessageRouter::neu(registry.clone());
        let calls = CallStateMachine::neu(registry.clone(), presence.clone());

        Arc::new(Self {
            config: Arc::new(config),
            registry,
            presence,
            router,
            calls,
        })
    }
}
