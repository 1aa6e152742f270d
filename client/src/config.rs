//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! gegen einen lokalen Server lauffaehig ist.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use echomesh_core::types::RoomId;
use echomesh_protocol::codec::{OpusConfig, DEFAULT_BITRATE_KBPS};
use echomesh_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};

use crate::logging::{log_format_gueltig, log_level_gueltig};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server-Adressen (Control + Media)
    pub server: ServerEinstellungen,
    /// Zugangsdaten
    pub account: KontoEinstellungen,
    /// Zielraum
    pub room: RaumEinstellungen,
    /// Audio-Modus und Geraete
    pub audio: AudioEinstellungen,
    /// Timeouts und Grenzen des Transports
    pub transport: TransportEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Server-Adressen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// TCP-Adresse des Control-Kanals ("host:port")
    pub control_address: String,
    /// UDP-Adresse des Media-Kanals ("host:port")
    pub media_address: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            control_address: "127.0.0.1:8888".into(),
            media_address: "127.0.0.1:12345".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KontoEinstellungen {
    pub username: String,
    pub password: String,
}

impl Default for KontoEinstellungen {
    fn default() -> Self {
        Self {
            username: "test_user".into(),
            password: "password123".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaumEinstellungen {
    pub room_id: String,
    /// Vor dem Beitritt `Create` senden; "existiert bereits" ist kein Fehler
    pub create_if_missing: bool,
    /// Chat-Nachricht direkt nach dem Beitritt (optional)
    pub greeting: Option<String>,
}

impl Default for RaumEinstellungen {
    fn default() -> Self {
        Self {
            room_id: "roomA".into(),
            create_if_missing: false,
            greeting: None,
        }
    }
}

/// Welche Media-Aktivitaeten nach dem Beitritt laufen
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioModus {
    /// Nur Mikrofon -> Server
    SendOnly,
    /// Nur Server -> Lautsprecher (Listener)
    ReceiveOnly,
    #[default]
    Both,
}

impl AudioModus {
    pub fn sendet(&self) -> bool {
        matches!(self, Self::SendOnly | Self::Both)
    }

    pub fn empfaengt(&self) -> bool {
        matches!(self, Self::ReceiveOnly | Self::Both)
    }
}

impl std::fmt::Display for AudioModus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SendOnly => "send_only",
            Self::ReceiveOnly => "receive_only",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    pub mode: AudioModus,
    /// Teilstring des Eingabegeraete-Namens (leer = Standardgeraet)
    pub input_device: Option<String>,
    /// Teilstring des Ausgabegeraete-Namens (leer = Standardgeraet)
    pub output_device: Option<String>,
    /// Opus-Zielbitrate in kbit/s
    pub bitrate_kbps: u16,
    /// Wartezeit auf einen vollstaendigen Mikrofon-Frame
    pub capture_timeout_ms: u64,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            mode: AudioModus::Both,
            input_device: None,
            output_device: None,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            capture_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportEinstellungen {
    /// Maximale Blockierzeit eines UDP-Empfangs
    pub receive_timeout_ms: u64,
    /// Wartezeit pro Aktivitaet beim Beenden
    pub shutdown_grace_ms: u64,
    /// Groesster erlaubter Control-Frame
    pub max_frame_bytes: usize,
}

impl Default for TransportEinstellungen {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 100,
            shutdown_grace_ms: 2000,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
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

/// Woher `ClientConfig::laden` die Werte hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigQuelle {
    Datei,
    /// Datei fehlt, alle Werte sind Defaults
    Standardwerte,
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    ///
    /// Laeuft vor dem Logging-Setup; der Aufrufer meldet
    /// `ConfigQuelle::Standardwerte` selbst.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigQuelle)> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok((config, ConfigQuelle::Datei))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::default(), ConfigQuelle::Standardwerte))
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft alle Werte bevor irgendeine Verbindung aufgebaut wird
    pub fn validieren(&self) -> Result<(), String> {
        if self.account.username.trim().is_empty() {
            return Err("account.username darf nicht leer sein".into());
        }
        if self.room.room_id.trim().is_empty() {
            return Err("room.room_id darf nicht leer sein".into());
        }
        adresse_aufloesen(&self.server.control_address)
            .map_err(|e| format!("server.control_address: {e}"))?;
        adresse_aufloesen(&self.server.media_address)
            .map_err(|e| format!("server.media_address: {e}"))?;
        self.opus_config()
            .validieren()
            .map_err(|e| format!("audio.bitrate_kbps: {e}"))?;
        if self.audio.capture_timeout_ms == 0 {
            return Err("audio.capture_timeout_ms muss groesser 0 sein".into());
        }
        if self.transport.receive_timeout_ms == 0 {
            return Err("transport.receive_timeout_ms muss groesser 0 sein".into());
        }
        if self.transport.shutdown_grace_ms == 0 {
            return Err("transport.shutdown_grace_ms muss groesser 0 sein".into());
        }
        if self.transport.max_frame_bytes == 0 {
            return Err("transport.max_frame_bytes muss groesser 0 sein".into());
        }
        if !log_level_gueltig(&self.logging.level) {
            return Err(format!("logging.level ungueltig: '{}'", self.logging.level));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(format!("logging.format ungueltig: '{}'", self.logging.format));
        }
        Ok(())
    }

    /// Aufgeloeste UDP-Adresse des Servers
    pub fn media_adresse(&self) -> Result<SocketAddr, String> {
        adresse_aufloesen(&self.server.media_address)
    }

    pub fn room_id(&self) -> RoomId {
        RoomId::new(self.room.room_id.trim())
    }

    pub fn opus_config(&self) -> OpusConfig {
        OpusConfig::mit_bitrate(self.audio.bitrate_kbps)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.audio.capture_timeout_ms)
    }

    pub fn empfangs_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.receive_timeout_ms)
    }

    pub fn shutdown_frist(&self) -> Duration {
        Duration::from_millis(self.transport.shutdown_grace_ms)
    }
}

/// Loest "host:port" zur ersten Adresse auf
fn adresse_aufloesen(adresse: &str) -> Result<SocketAddr, String> {
    adresse
        .to_socket_addrs()
        .map_err(|e| format!("'{adresse}' nicht aufloesbar: {e}"))?
        .next()
        .ok_or_else(|| format!("'{adresse}' liefert keine Adresse"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.server.control_address, "127.0.0.1:8888");
        assert_eq!(cfg.audio.mode, AudioModus::Both);
        assert_eq!(cfg.audio.bitrate_kbps, 64);
        assert_eq!(cfg.transport.max_frame_bytes, 1024 * 1024);
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [account]
            username = "alice"
            password = "pw"

            [room]
            room_id = "roomB"
            create_if_missing = true

            [audio]
            mode = "receive_only"
            output_device = "Headset"
            capture_timeout_ms = 250
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.account.username, "alice");
        assert_eq!(cfg.room_id(), RoomId::new("roomB"));
        assert!(cfg.room.create_if_missing);
        assert_eq!(cfg.audio.mode, AudioModus::ReceiveOnly);
        assert_eq!(cfg.audio.output_device.as_deref(), Some("Headset"));
        assert_eq!(cfg.capture_timeout(), Duration::from_millis(250));
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.server.media_address, "127.0.0.1:12345");
        assert_eq!(cfg.transport.receive_timeout_ms, 100);
    }

    #[test]
    fn modus_bestimmt_aktivitaeten() {
        assert!(AudioModus::SendOnly.sendet() && !AudioModus::SendOnly.empfaengt());
        assert!(!AudioModus::ReceiveOnly.sendet() && AudioModus::ReceiveOnly.empfaengt());
        assert!(AudioModus::Both.sendet() && AudioModus::Both.empfaengt());
    }

    #[test]
    fn validierung_lehnt_fehler_ab() {
        let mut cfg = ClientConfig::default();
        cfg.account.username = "  ".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ClientConfig::default();
        cfg.room.room_id = String::new();
        assert!(cfg.validieren().is_err());

        let mut cfg = ClientConfig::default();
        cfg.server.media_address = "kein-port".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ClientConfig::default();
        cfg.audio.bitrate_kbps = 1000;
        assert!(cfg.validieren().is_err());

        let mut cfg = ClientConfig::default();
        cfg.audio.capture_timeout_ms = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = ClientConfig::default();
        cfg.transport.receive_timeout_ms = 0;
        assert!(cfg.validieren().is_err());

        let mut cfg = ClientConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let (cfg, quelle) = ClientConfig::laden("/gibt/es/nicht/echomesh.toml").unwrap();
        assert_eq!(quelle, ConfigQuelle::Standardwerte);
        assert_eq!(cfg.room.room_id, "roomA");
    }

    #[test]
    fn vorhandene_datei_wird_gelesen() {
        let pfad = std::env::temp_dir().join(format!("echomesh-test-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[room]\nroom_id = \"lobby\"\n").unwrap();

        let ergebnis = ClientConfig::laden(pfad.to_str().unwrap());
        std::fs::remove_file(&pfad).unwrap();

        let (cfg, quelle) = ergebnis.unwrap();
        assert_eq!(quelle, ConfigQuelle::Datei);
        assert_eq!(cfg.room.room_id, "lobby");
    }
}
