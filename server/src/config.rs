//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use signalhub_observability::log_format_gueltig;
use signalhub_signaling::SignalingConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Queue- und Nachrichtengrenzen
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Signalhub".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse des Listeners
    pub bind_adresse: String,
    /// Port des Listeners
    pub port: u16,
    /// HTTP-Pfad fuer das WebSocket-Upgrade
    pub pfad: String,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 9090,
            pfad: "/signal".into(),
        }
    }
}

/// Queue- und Nachrichtengrenzen pro Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Maximale Groesse einer eingehenden Nachricht in Bytes
    pub max_nachricht_bytes: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            send_queue_groesse: standard.send_queue_groesse,
            max_nachricht_bytes: standard.max_nachricht_bytes,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder EnvFilter-Ausdruck
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Logging ist hier noch nicht initialisiert
                eprintln!("Konfigurationsdatei '{pfad}' nicht gefunden, verwende Standardwerte");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if !self.netzwerk.pfad.starts_with('/') {
            anyhow::bail!(
                "netzwerk.pfad muss mit '/' beginnen, ist '{}'",
                self.netzwerk.pfad
            );
        }
        if self.signaling.send_queue_groesse == 0 {
            anyhow::bail!("signaling.send_queue_groesse muss groesser als 0 sein");
        }
        if self.signaling.max_nachricht_bytes == 0 {
            anyhow::bail!("signaling.max_nachricht_bytes muss groesser als 0 sein");
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!(
                "logging.format muss 'text' oder 'json' sein, ist '{}'",
                self.logging.format
            );
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse des Listeners zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Baut die Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            pfad: self.netzwerk.pfad.clone(),
            send_queue_groesse: self.signaling.send_queue_groesse,
            max_nachricht_bytes: self.signaling.max_nachricht_bytes,
        }
    }
}
