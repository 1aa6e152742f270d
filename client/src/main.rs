//! Echomesh Client – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den
//! Orchestrator. Ctrl-C beendet den Lauf geordnet.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use echomesh_audio::CpalOpusBackend;
use echomesh_client::logging::logging_initialisieren;
use echomesh_client::{ClientConfig, ConfigQuelle, Orchestrator};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("ECHOMESH_CONFIG").unwrap_or_else(|_| "echomesh.toml".into());

    let (config, quelle) = ClientConfig::laden(&config_pfad)?;
    logging_initialisieren(&config.logging.level, &config.logging.format);
    if quelle == ConfigQuelle::Standardwerte {
        tracing::warn!(pfad = %config_pfad, "Konfigurationsdatei nicht gefunden, verwende Standardwerte");
    }

    config
        .validieren()
        .map_err(|e| anyhow::anyhow!("Ungueltige Konfiguration: {e}"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        server = %config.server.control_address,
        "Echomesh Client wird gestartet"
    );

    let backend = CpalOpusBackend::new(config.opus_config())
        .mit_geraeten(
            config.audio.input_device.clone(),
            config.audio.output_device.clone(),
        )
        .mit_capture_timeout(config.capture_timeout());
    let orchestrator = Orchestrator::neu(config, Arc::new(backend));

    let unterbrechung = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Ctrl-C-Handler nicht verfuegbar: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Ctrl-C empfangen, beende");
    };

    match orchestrator.ausfuehren(unterbrechung).await {
        Ok(abschluss) if abschluss.ist_sauber() => Ok(ExitCode::SUCCESS),
        Ok(abschluss) => {
            tracing::warn!(aktivitaeten = ?abschluss.aktivitaeten, "Nicht alle Aktivitaeten sauber beendet");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            tracing::error!("Echomesh Client beendet mit Fehler: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
