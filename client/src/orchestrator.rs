//! Session-Orchestrator
//!
//! Besitzt Session, Media-Socket und Aktivitaeten und legt die
//! Reihenfolge fest:
//!
//! 1. Control-Session bis `InRoom` (oder `Failed`)
//! 2. Media-Aktivitaeten je nach Modus starten
//! 3. Warten auf Unterbrechung, Shutdown-Signal oder Verbindungsverlust
//! 4. Shutdown: Signal setzen, Aktivitaeten begrenzt abwarten, Socket
//!    freigeben, Raum verlassen und Control-Stream schliessen

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use echomesh_audio::AudioBackend;
use echomesh_core::{EchomeshError, ShutdownSignal, UserId};
use echomesh_protocol::control::ControlEnvelope;
use echomesh_voice::{
    starte_empfang, starte_senden, Aktivitaet, AktivitaetsEnde, MediaSocket, MediaStatistik,
    StatistikSnapshot,
};

use crate::config::ClientConfig;
use crate::session::{chat_zeile, ControlSession, SessionError};

/// Warum der Client den Raum verlassen hat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Beendigungsgrund {
    /// Externe Unterbrechung (Ctrl-C)
    Unterbrechung,
    /// Shutdown-Signal, z.B. nach einem Geraetefehler
    Signal,
}

/// Ergebnis eines vollstaendigen Laufs
#[derive(Debug, Clone)]
pub struct Abschluss {
    pub grund: Beendigungsgrund,
    /// Pro gestarteter Aktivitaet: Name und Ende (`None` = abgekoppelt)
    pub aktivitaeten: Vec<(&'static str, Option<AktivitaetsEnde>)>,
    pub statistik: StatistikSnapshot,
}

impl Abschluss {
    /// true wenn jede Aktivitaet regulaer beendet wurde
    pub fn ist_sauber(&self) -> bool {
        self.aktivitaeten
            .iter()
            .all(|(_, ende)| matches!(ende, Some(AktivitaetsEnde::Beendet)))
    }
}

/// Steuert den gesamten Lebenszyklus eines Client-Laufs
pub struct Orchestrator {
    config: ClientConfig,
    backend: Arc<dyn AudioBackend>,
    shutdown: ShutdownSignal,
    statistik: Arc<MediaStatistik>,
}

impl Orchestrator {
    pub fn neu(config: ClientConfig, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            config,
            backend,
            shutdown: ShutdownSignal::neu(),
            statistik: Arc::new(MediaStatistik::neu()),
        }
    }

    /// Handle auf das gemeinsame Shutdown-Signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Fuehrt einen Lauf aus bis `unterbrechung` fertig ist, das
    /// Shutdown-Signal gesetzt wird oder die Control-Verbindung abbricht
    pub async fn ausfuehren<F>(self, unterbrechung: F) -> Result<Abschluss, EchomeshError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(unterbrechung);

        let media_adresse = self
            .config
            .media_adresse()
            .map_err(EchomeshError::Konfiguration)?;

        // 1. Control-Session bis InRoom
        let mut session = ControlSession::neu(&self.config, self.shutdown.clone());
        tokio::select! {
            ergebnis = session.verbinden_und_beitreten() => {
                if let Err(e) = ergebnis {
                    error!(fehler = %e, "Session fehlgeschlagen");
                    self.shutdown.ausloesen();
                    return Err(e.into());
                }
            }
            _ = &mut unterbrechung => {
                info!("Unterbrochen vor dem Raumbeitritt");
                session.schliessen().await;
                return Ok(Abschluss {
                    grund: Beendigungsgrund::Unterbrechung,
                    aktivitaeten: Vec::new(),
                    statistik: self.statistik.snapshot(),
                });
            }
        }

        let user_id = session.state().user_id();
        let modus = self.config.audio.mode;
        info!(user_id = %user_id, room = %session.state().room_id(), modus = %modus, "Im Raum, starte Media-Transport");

        // 2. Media-Aktivitaeten
        let socket = match MediaSocket::binden(media_adresse, self.config.empfangs_timeout()) {
            Ok(socket) => socket,
            Err(e) => {
                error!(fehler = %e, "Media-Socket nicht verfuegbar");
                session.verlassen_und_schliessen().await;
                return Err(EchomeshError::Medien(e.to_string()));
            }
        };

        let aktivitaeten = self.aktivitaeten_starten(&socket, user_id, modus.sendet(), modus.empfaengt());

        // Listener-Modus: Server soll unsere Adresse lernen bevor er etwas weiterleitet
        if !modus.sendet() {
            if let Err(e) = socket.sende_registrierung(user_id) {
                warn!(fehler = %e, "Registrierungs-Paket nicht gesendet");
            }
        }

        if let Some(gruss) = self.config.room.greeting.as_deref() {
            if let Err(e) = session.chat_senden(gruss).await {
                warn!(fehler = %e, "Begruessung nicht gesendet");
            }
        }

        // 3. Warten
        let ende = tokio::select! {
            _ = &mut unterbrechung => Ok(Beendigungsgrund::Unterbrechung),
            _ = self.shutdown.abwarten() => Ok(Beendigungsgrund::Signal),
            e = Self::control_beobachten(&mut session) => Err(e),
        };

        // 4. Shutdown
        self.shutdown.ausloesen();
        info!("Beende Media-Transport");
        let enden = Self::aktivitaeten_beenden(aktivitaeten, self.config.shutdown_frist()).await;
        drop(socket);

        let statistik = self.statistik.snapshot();
        info!("Media-Statistik: {}", statistik.zusammenfassung());

        match ende {
            Ok(grund) => {
                session.verlassen_und_schliessen().await;
                info!(grund = ?grund, "Client beendet");
                Ok(Abschluss {
                    grund,
                    aktivitaeten: enden,
                    statistik,
                })
            }
            Err(e) => {
                session.schliessen().await;
                Err(e.into())
            }
        }
    }

    fn aktivitaeten_starten(
        &self,
        socket: &MediaSocket,
        user_id: UserId,
        senden: bool,
        empfangen: bool,
    ) -> Vec<Aktivitaet> {
        let mut aktivitaeten = Vec::with_capacity(2);

        if empfangen {
            match starte_empfang(
                socket.clone(),
                Arc::clone(&self.backend),
                self.shutdown.clone(),
                Arc::clone(&self.statistik),
            ) {
                Ok(akt) => aktivitaeten.push(akt),
                Err(e) => {
                    error!(fehler = %e, "Empfangs-Aktivitaet nicht gestartet");
                    self.shutdown.ausloesen();
                }
            }
        }

        if senden {
            match starte_senden(
                socket.clone(),
                user_id,
                Arc::clone(&self.backend),
                self.shutdown.clone(),
                Arc::clone(&self.statistik),
            ) {
                Ok(akt) => aktivitaeten.push(akt),
                Err(e) => {
                    error!(fehler = %e, "Sende-Aktivitaet nicht gestartet");
                    self.shutdown.ausloesen();
                }
            }
        }

        aktivitaeten
    }

    /// Liest den Control-Stream bis zum ersten fatalen Fehler
    async fn control_beobachten(session: &mut ControlSession) -> SessionError {
        loop {
            match session.empfangen().await {
                Ok(ControlEnvelope::ChatMessage(chat)) => info!("Chat {}", chat_zeile(&chat)),
                Ok(andere) => debug!(kind = %andere.kind(), "Control-Nachricht im Raum ignoriert"),
                Err(e) => {
                    error!(fehler = %e, "Control-Verbindung beendet");
                    return e;
                }
            }
        }
    }

    /// Wartet pro Aktivitaet hoechstens `frist`
    async fn aktivitaeten_beenden(
        aktivitaeten: Vec<Aktivitaet>,
        frist: Duration,
    ) -> Vec<(&'static str, Option<AktivitaetsEnde>)> {
        let mut enden = Vec::with_capacity(aktivitaeten.len());
        for akt in aktivitaeten {
            let name = akt.name();
            let ende = match tokio::task::spawn_blocking(move || akt.beenden(frist)).await {
                Ok(ende) => ende,
                Err(e) => {
                    error!(aktivitaet = name, fehler = %e, "Warten auf Aktivitaet fehlgeschlagen");
                    None
                }
            };
            enden.push((name, ende));
        }
        enden
    }
}
