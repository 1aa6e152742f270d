//! Logging fuer den Client (tracing-subscriber)
//!
//! Level und Format kommen aus der Konfiguration; Umgebungsvariablen
//! haben Vorrang:
//! - `ECHOMESH_LOG_LEVEL`: Filter-Ausdruck (z.B. `debug` oder
//!   `echomesh_voice=trace,info`)
//! - `ECHOMESH_LOG_FORMAT`: `text` oder `json`

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "ECHOMESH_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "ECHOMESH_LOG_FORMAT";

/// Installiert den globalen Subscriber; Thread-Namen erscheinen im Log,
/// damit Sende- und Empfangs-Aktivitaet unterscheidbar sind.
///
/// Nur einmal pro Prozess aufrufen.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());

    match format_env.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_names(true)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_names(true)
                .init();
        }
    }
}

/// Erlaubte Werte fuer `logging.level` in der Konfigurationsdatei
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// `text` oder `json`
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bekannte_level_sind_gueltig() {
        assert!(["trace", "debug", "info", "warn", "error"]
            .iter()
            .all(|l| log_level_gueltig(l)));
    }

    #[test]
    fn unbekannte_level_und_formate_sind_ungueltig() {
        for wert in ["verbose", "Info", "", "warning"] {
            assert!(!log_level_gueltig(wert), "{wert}");
        }
        for wert in ["xml", "JSON", "pretty"] {
            assert!(!log_format_gueltig(wert), "{wert}");
        }
        assert!(log_format_gueltig("json") && log_format_gueltig("text"));
    }
}
