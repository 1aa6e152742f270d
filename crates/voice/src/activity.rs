//! Handle einer laufenden Media-Aktivitaet
//!
//! Beenden laeuft in zwei Stufen: das gemeinsame `ShutdownSignal`
//! ausloesen, dann hier begrenzt auf das Thread-Ende warten. Reagiert
//! der Thread nicht innerhalb der Frist, wird er abgekoppelt.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

/// Poll-Intervall beim Warten auf das Thread-Ende
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Wie eine Aktivitaet geendet hat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AktivitaetsEnde {
    /// Shutdown beobachtet
    Beendet,
    /// Audio-Geraet ausgefallen (fatal fuer diese Aktivitaet)
    Geraetefehler(String),
    /// Thread ist in Panic gegangen
    Panik,
}

/// Laufender Sende- oder Empfangs-Thread
#[derive(Debug)]
pub struct Aktivitaet {
    name: &'static str,
    handle: JoinHandle<AktivitaetsEnde>,
}

impl Aktivitaet {
    pub(crate) fn neu(name: &'static str, handle: JoinHandle<AktivitaetsEnde>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wartet hoechstens `frist` auf das Ende des Threads
    ///
    /// Gibt `None` zurueck wenn der Thread abgekoppelt wurde. Blockiert;
    /// aus async-Code ueber `spawn_blocking` aufrufen.
    pub fn beenden(self, frist: Duration) -> Option<AktivitaetsEnde> {
        let start = Instant::now();
        while !self.handle.is_finished() {
            if start.elapsed() >= frist {
                warn!(
                    aktivitaet = self.name,
                    frist_ms = frist.as_millis() as u64,
                    "Aktivitaet reagiert nicht, wird abgekoppelt"
                );
                return None;
            }
            std::thread::sleep(JOIN_POLL);
        }

        match self.handle.join() {
            Ok(ende) => {
                debug!(aktivitaet = self.name, ende = ?ende, "Aktivitaet beendet");
                Some(ende)
            }
            Err(_) => {
                error!(aktivitaet = self.name, "Aktivitaet mit Panic beendet");
                Some(AktivitaetsEnde::Panik)
            }
        }
    }
}
