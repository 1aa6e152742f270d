//! echomesh-voice – Media-Transport des Clients
//!
//! Verschickt und empfaengt Audio-Datagramme ueber einen UDP-Socket.
//! Sende- und Empfangsseite laufen als benannte OS-Threads, da die
//! Audio-Geraete blockierend arbeiten und nicht `Send` sind.
//!
//! ## Module
//! - [`socket`] – Media-Socket und Registrierungs-Paket
//! - [`send`] – Sende-Aktivitaet (Mikrofon -> UDP)
//! - [`receive`] – Empfangs-Aktivitaet (UDP -> Lautsprecher)
//! - [`activity`] – Handle mit begrenztem Warten beim Beenden
//! - [`stats`] – Zaehler fuer beide Richtungen

pub mod activity;
pub mod receive;
pub mod send;
pub mod socket;
pub mod stats;

pub use activity::{Aktivitaet, AktivitaetsEnde};
pub use receive::starte_empfang;
pub use send::starte_senden;
pub use socket::{MediaError, MediaResult, MediaSocket};
pub use stats::{MediaStatistik, StatistikSnapshot};

