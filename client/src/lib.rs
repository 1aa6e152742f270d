//! echomesh-client – Sprach-Client
//!
//! ## Module
//! - [`config`] – TOML-Konfiguration mit Standardwerten
//! - [`logging`] – tracing-subscriber Setup
//! - [`session`] – Control-Session (Login, Raumbeitritt) als Zustandsautomat
//! - [`orchestrator`] – Lebenszyklus: Session, Media-Aktivitaeten, Shutdown

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod session;

pub use config::{AudioModus, ClientConfig, ConfigQuelle};
pub use orchestrator::{Abschluss, Orchestrator};
pub use session::{ConnectionPhase, ControlSession, SessionError, SessionResult, SessionState};
