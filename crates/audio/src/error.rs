//! Fehlertypen fuer den Audio-Adapter

use thiserror::Error;

/// Alle moeglichen Fehler des Audio-Adapters
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    /// Geraet hat innerhalb der Wartezeit keinen vollstaendigen Frame geliefert
    #[error("Unvollstaendiger Frame: {erhalten} von {erwartet} Samples")]
    UnvollstaendigerFrame { erwartet: usize, erhalten: usize },

    #[error("Codec-Fehler: {0}")]
    CodecFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl AudioError {
    /// true fuer Fehler des Geraets (fatal fuer die besitzende Aktivitaet)
    pub fn ist_geraetefehler(&self) -> bool {
        matches!(
            self,
            Self::GeraetNichtGefunden(_)
                | Self::KeinStandardEingabegeraet
                | Self::KeinStandardAusgabegeraet
                | Self::StreamFehler(_)
                | Self::UnvollstaendigerFrame { .. }
        )
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
