//! Fehlertypen fuer Echomesh
//!
//! Zentraler Fehler-Enum fuer die Prozessebene. Die Fach-Crates definieren
//! eigene Fehler (Wire, Audio, Session) und werden hier als Text gebuendelt.

use thiserror::Error;

/// Globaler Result-Alias fuer Echomesh
pub type Result<T> = std::result::Result<T, EchomeshError>;

/// Alle Fehler die den Client-Prozess als Ganzes betreffen
#[derive(Debug, Error)]
pub enum EchomeshError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung abgelehnt: {0}")]
    VerbindungAbgelehnt(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Server-Antworten ---
    #[error("Login abgelehnt: {0}")]
    LoginAbgelehnt(String),

    #[error("Raumbeitritt abgelehnt: {0}")]
    BeitrittAbgelehnt(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Media-Transport ---
    #[error("Media-Transport: {0}")]
    Medien(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}
