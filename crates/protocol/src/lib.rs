//! echomesh-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert die Nachrichten des Control-Kanals (TCP),
//! deren Framing sowie das binaere Audio-Paket des Media-Kanals (UDP).

pub mod codec;
pub mod control;
pub mod voice;
pub mod wire;

pub use control::{ControlEnvelope, MessageKind};
pub use voice::{AudioPacketHeader, PacketError};
pub use wire::{EnvelopeCodec, WireError};
