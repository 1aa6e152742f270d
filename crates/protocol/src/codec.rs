//! Audio-Parameter fuer die Uebertragung
//!
//! Die Frame-Geometrie ist fest einkompiliert (48 kHz, Mono, 20 ms,
//! 16-Bit-PCM). Konfigurierbar ist nur die Opus-Zielbitrate.

use serde::{Deserialize, Serialize};

/// Abtastrate in Hz
pub const SAMPLE_RATE: u32 = 48_000;

/// Mono
pub const CHANNELS: u16 = 1;

/// Frame-Dauer in Millisekunden
pub const FRAME_DURATION_MS: u32 = 20;

/// Samples pro Frame (20 ms bei 48 kHz)
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE * FRAME_DURATION_MS / 1000) as usize;

/// Standard-Zielbitrate
pub const DEFAULT_BITRATE_KBPS: u16 = 64;

/// Opus-Anwendungsmodus
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpusApplication {
    /// Optimiert fuer Sprachverstaendlichkeit
    #[default]
    Voip,
    /// Optimiert fuer allgemeine Audio-Qualitaet
    Audio,
    /// Minimale Verarbeitungsverzoegerung
    RestrictedLowdelay,
}

/// Opus-Codec-Konfiguration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpusConfig {
    /// Ziel-Bitrate in kbps (6–510)
    pub bitrate_kbps: u16,
    pub application: OpusApplication,
}

impl Default for OpusConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            application: OpusApplication::Voip,
        }
    }
}

impl OpusConfig {
    pub fn mit_bitrate(bitrate_kbps: u16) -> Self {
        Self {
            bitrate_kbps,
            ..Self::default()
        }
    }

    /// Validiert die Konfiguration
    pub fn validieren(&self) -> Result<(), String> {
        if self.bitrate_kbps < 6 || self.bitrate_kbps > 510 {
            return Err(format!(
                "Bitrate muss zwischen 6 und 510 kbps liegen (war: {})",
                self.bitrate_kbps
            ));
        }
        Ok(())
    }

    pub fn bitrate_bps(&self) -> i32 {
        i32::from(self.bitrate_kbps) * 1000
    }
}
