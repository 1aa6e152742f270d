//! Wire-Format fuer den Control-Kanal (TCP)
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + postcard-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4 Laengen-Bytes).
//! Das Wire-Format selbst kennt kein Limit ausser dem u32-Bereich; Leser und
//! Schreiber lehnen Frames oberhalb von `max_frame_size` ab.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::control::ControlEnvelope;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Lesen oder Schreiben eines Control-Frames
#[derive(Debug, Error)]
pub enum WireError {
    /// Gegenstelle hat die Verbindung an einer Lese-Grenze geschlossen
    #[error("Verbindung geschlossen")]
    ConnectionClosed,

    #[error("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    FrameTooLarge { laenge: usize, maximum: usize },

    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[source] postcard::Error),

    #[error("Deserialisierung fehlgeschlagen: {0}")]
    Deserialisierung(#[source] postcard::Error),

    #[error("IO-Fehler: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// true wenn der Fehler einen Verbindungsverlust bedeutet
    pub fn ist_verbindungsverlust(&self) -> bool {
        match self {
            WireError::ConnectionClosed => true,
            WireError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

pub type WireResult<T> = Result<T, WireError>;

// ---------------------------------------------------------------------------
// Freie Funktionen
// ---------------------------------------------------------------------------

/// Serialisiert einen Envelope inklusive 4-Byte-Laengenpraefix
///
/// Einzige Grenze ist der u32-Bereich des Laengen-Felds.
pub fn encode_envelope(envelope: &ControlEnvelope) -> WireResult<Vec<u8>> {
    encode_envelope_max(envelope, u32::MAX as usize)
}

/// Wie `encode_envelope`, lehnt aber Payloads ueber `max_frame_size` ab
pub fn encode_envelope_max(
    envelope: &ControlEnvelope,
    max_frame_size: usize,
) -> WireResult<Vec<u8>> {
    let payload = postcard::to_stdvec(envelope).map_err(WireError::Serialisierung)?;
    pruefe_laenge(payload.len(), max_frame_size)?;

    let mut frame = Vec::with_capacity(LENGTH_FIELD_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Parst die Payload eines Frames (ohne Laengen-Feld)
pub fn parse_envelope(payload: &[u8]) -> WireResult<ControlEnvelope> {
    postcard::from_bytes(payload).map_err(WireError::Deserialisierung)
}

fn pruefe_laenge(laenge: usize, maximum: usize) -> WireResult<()> {
    if laenge > maximum || laenge > u32::MAX as usize {
        return Err(WireError::FrameTooLarge { laenge, maximum });
    }
    Ok(())
}

/// Liest genau `buf.len()` Bytes; 0 gelesene Bytes = Verbindung geschlossen
async fn lesen_exakt<R>(reader: &mut R, buf: &mut [u8]) -> WireResult<()>
where
    R: AsyncRead + Unpin,
{
    let mut gelesen = 0;
    while gelesen < buf.len() {
        let n = reader.read(&mut buf[gelesen..]).await?;
        if n == 0 {
            return Err(WireError::ConnectionClosed);
        }
        gelesen += n;
    }
    Ok(())
}

/// Liest einen einzelnen Envelope aus einem `AsyncRead`
///
/// Teilweise Lesevorgaenge werden zusammengesetzt.
///
/// # Fehler
/// - `ConnectionClosed` wenn der Stream an irgendeiner Lese-Grenze 0 Bytes liefert
/// - `FrameTooLarge` wenn das Laengen-Feld `max_frame_size` ueberschreitet
/// - `Deserialisierung` bei ungueltiger Payload
pub async fn decode_envelope<R>(reader: &mut R, max_frame_size: usize) -> WireResult<ControlEnvelope>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    lesen_exakt(reader, &mut len_buf).await?;
    let laenge = u32::from_be_bytes(len_buf) as usize;
    pruefe_laenge(laenge, max_frame_size)?;

    let mut payload = vec![0u8; laenge];
    lesen_exakt(reader, &mut payload).await?;

    parse_envelope(&payload)
}

/// Schreibt einen einzelnen Envelope in einen `AsyncWrite`
pub async fn write_envelope<W>(
    writer: &mut W,
    envelope: &ControlEnvelope,
    max_frame_size: usize,
) -> WireResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_envelope_max(envelope, max_frame_size)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// EnvelopeCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer `Framed<TcpStream, EnvelopeCodec>`
///
/// Im Gegensatz zu `decode_envelope` ist `Framed::next()` abbruchsicher und
/// kann daher in `tokio::select!` verwendet werden.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    max_frame_size: usize,
}

impl EnvelopeCodec {
    /// Erstellt einen Codec mit Standard-Limit
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen Codec mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = ControlEnvelope;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let laenge = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        pruefe_laenge(laenge, self.max_frame_size)?;

        let gesamt = LENGTH_FIELD_SIZE + laenge;
        if src.len() < gesamt {
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(laenge);
        parse_envelope(&payload).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(envelope) => Ok(Some(envelope)),
            None if src.is_empty() => Ok(None),
            // Stream endet mitten im Frame
            None => Err(WireError::ConnectionClosed),
        }
    }
}

impl Encoder<ControlEnvelope> for EnvelopeCodec {
    type Error = WireError;

    fn encode(&mut self, item: ControlEnvelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = postcard::to_stdvec(&item).map_err(WireError::Serialisierung)?;
        pruefe_laenge(payload.len(), self.max_frame_size)?;

        dst.reserve(LENGTH_FIELD_SIZE + payload.len());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
