//! echomesh-audio – Client Audio-Adapter
//!
//! Kapselt Audio-Geraet und Sprach-Codec hinter zwei gerichteten Pipelines:
//! - Capture: Mikrofon-Frame lesen -> Opus kodieren
//! - Playback: Opus dekodieren -> Frame an den Lautsprecher
//!
//! Geraet und Codec sind Traits; die Produktiv-Implementierung nutzt
//! cpal und audiopus (`CpalOpusBackend`).

pub mod backend;
pub mod capture;
pub mod codec;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod playback;
#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

// Bequeme Re-Exporte der wichtigsten Typen
pub use backend::CpalOpusBackend;
pub use codec::{OpusDecoder, OpusEncoder, SpeechDecoder, SpeechEncoder};
pub use device::{FrameSink, FrameSource};
pub use error::{AudioError, AudioResult};
pub use pipeline::{AudioBackend, CapturePipeline, PlaybackPipeline, Wiedergabe};
