//! echomesh-core – Gemeinsame Typen, Shutdown-Signal und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Echomesh-Crates gemeinsam genutzt werden.

pub mod error;
pub mod shutdown;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{EchomeshError, Result};
pub use shutdown::ShutdownSignal;
pub use types::{RoomId, UserId};
