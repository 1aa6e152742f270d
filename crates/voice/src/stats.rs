//! Zaehler fuer den Media-Transport
//!
//! Jede Aktivitaet schreibt nur ihre eigenen Felder; gelesen wird per
//! `snapshot()` (z.B. fuer die Zusammenfassung beim Beenden).

use std::sync::atomic::{AtomicU64, Ordering};

/// Laufende Zaehler beider Aktivitaeten
#[derive(Debug, Default)]
pub struct MediaStatistik {
    // Senden
    pakete_gesendet: AtomicU64,
    bytes_gesendet: AtomicU64,
    sendefehler: AtomicU64,
    kodierfehler: AtomicU64,
    // Empfangen
    pakete_empfangen: AtomicU64,
    bytes_empfangen: AtomicU64,
    ungueltige_pakete: AtomicU64,
    verworfene_frames: AtomicU64,
    leere_pakete: AtomicU64,
    frames_abgespielt: AtomicU64,
    empfangsfehler: AtomicU64,
}

/// Unveraenderliche Momentaufnahme der Zaehler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatistikSnapshot {
    pub pakete_gesendet: u64,
    pub bytes_gesendet: u64,
    pub sendefehler: u64,
    pub kodierfehler: u64,
    pub pakete_empfangen: u64,
    pub bytes_empfangen: u64,
    /// Datagramme kuerzer als der Header
    pub ungueltige_pakete: u64,
    /// Nutzdaten die der Codec nicht dekodieren konnte
    pub verworfene_frames: u64,
    pub leere_pakete: u64,
    pub frames_abgespielt: u64,
    pub empfangsfehler: u64,
}

impl MediaStatistik {
    pub fn neu() -> Self {
        Self::default()
    }

    pub(crate) fn paket_gesendet(&self, bytes: usize) {
        self.pakete_gesendet.fetch_add(1, Ordering::Relaxed);
        self.bytes_gesendet.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn sendefehler(&self) {
        self.sendefehler.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn kodierfehler(&self) {
        self.kodierfehler.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn paket_empfangen(&self, bytes: usize) {
        self.pakete_empfangen.fetch_add(1, Ordering::Relaxed);
        self.bytes_empfangen.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn ungueltiges_paket(&self) {
        self.ungueltige_pakete.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_verworfen(&self) {
        self.verworfene_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn leeres_paket(&self) {
        self.leere_pakete.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_abgespielt(&self) {
        self.frames_abgespielt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn empfangsfehler(&self) {
        self.empfangsfehler.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatistikSnapshot {
        StatistikSnapshot {
            pakete_gesendet: self.pakete_gesendet.load(Ordering::Relaxed),
            bytes_gesendet: self.bytes_gesendet.load(Ordering::Relaxed),
            sendefehler: self.sendefehler.load(Ordering::Relaxed),
            kodierfehler: self.kodierfehler.load(Ordering::Relaxed),
            pakete_empfangen: self.pakete_empfangen.load(Ordering::Relaxed),
            bytes_empfangen: self.bytes_empfangen.load(Ordering::Relaxed),
            ungueltige_pakete: self.ungueltige_pakete.load(Ordering::Relaxed),
            verworfene_frames: self.verworfene_frames.load(Ordering::Relaxed),
            leere_pakete: self.leere_pakete.load(Ordering::Relaxed),
            frames_abgespielt: self.frames_abgespielt.load(Ordering::Relaxed),
            empfangsfehler: self.empfangsfehler.load(Ordering::Relaxed),
        }
    }
}

impl StatistikSnapshot {
    /// Gibt eine lesbare Zusammenfassung zurueck
    pub fn zusammenfassung(&self) -> String {
        format!(
            "Gesendet={} ({}kB, Fehler={}, Kodierfehler={}) Empfangen={} ({}kB) Abgespielt={} Leer={} Ungueltig={} Verworfen={} Empfangsfehler={}",
            self.pakete_gesendet,
            self.bytes_gesendet / 1000,
            self.sendefehler,
            self.kodierfehler,
            self.pakete_empfangen,
            self.bytes_empfangen / 1000,
            self.frames_abgespielt,
            self.leere_pakete,
            self.ungueltige_pakete,
            self.verworfene_frames,
            self.empfangsfehler,
        )
    }
}
