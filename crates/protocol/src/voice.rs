//! Voice-Protokoll (UDP)
//!
//! Binaere Paketstruktur fuer die Audio-Uebertragung via UDP.
//! Das Opus-Encoding erfolgt im Client; der Server leitet Pakete weiter.
//!
//! ## Paketformat (Header = 12 Bytes, kein serde)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       4   SequenzNummer (big-endian)
//!  4       4   Zeitstempel (big-endian)
//!  8       4   User-ID des Absenders (big-endian)
//! 12+      N   Nutzdaten (Opus-Bytes, 0..N)
//! ```
//!
//! Die Nutzdaten-Laenge ergibt sich aus der Datagramm-Laenge. Ein Paket ohne
//! Nutzdaten ist ein Registrierungs-Paket: es traegt kein Audio, sondern laesst
//! den Server die Absender-Adresse eines Users lernen.

use thiserror::Error;

/// Header-Groesse in Bytes
pub const HEADER_SIZE: usize = 12;

/// Empfangspuffer fuer ein Datagramm
///
/// Praktisch sind Pakete hoechstens ca. 2 KiB gross; der Puffer deckt jedes
/// UDP-Datagramm ab, damit `recv_from` nie kuerzt.
pub const EMPFANGSPUFFER_GROESSE: usize = 64 * 1024;

/// Fehler beim Dekodieren eines Audio-Datagramms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("Ungueltiges Audio-Paket: {laenge} Bytes (mindestens 12 erwartet)")]
    MalformedPacket { laenge: usize },
}

// ---------------------------------------------------------------------------
// AudioPacketHeader
// ---------------------------------------------------------------------------

/// 12-Byte Header eines Audio-UDP-Pakets
///
/// Direkte Byte-Serialisierung, kein serde (Hot Path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPacketHeader {
    /// Pro Absender monoton steigend; der Empfaenger wertet sie nicht aus
    pub sequence: u32,
    pub timestamp: u32,
    pub user_id: u32,
}

impl AudioPacketHeader {
    pub const SIZE: usize = HEADER_SIZE;

    pub fn new(sequence: u32, timestamp: u32, user_id: u32) -> Self {
        Self {
            sequence,
            timestamp,
            user_id,
        }
    }

    /// Serialisiert den Header (big-endian)
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.user_id.to_be_bytes());
        buf
    }

    /// Deserialisiert einen Header aus den ersten 12 Bytes
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < Self::SIZE {
            return Err(PacketError::MalformedPacket { laenge: buf.len() });
        }

        Ok(Self {
            sequence: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            user_id: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }
}

// ---------------------------------------------------------------------------
// Freie Funktionen (Hot Path ohne Zwischen-Allokation beim Empfang)
// ---------------------------------------------------------------------------

/// Haengt die Nutzdaten unveraendert an den Header an (kein Laengen-Praefix)
pub fn encode_audio_packet(sequence: u32, timestamp: u32, user_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&AudioPacketHeader::new(sequence, timestamp, user_id).encode());
    buf.extend_from_slice(payload);
    buf
}

/// Zerlegt ein Datagramm in Header und (moeglicherweise leere) Nutzdaten
///
/// # Fehler
/// - `MalformedPacket` wenn das Datagramm kuerzer als 12 Bytes ist
pub fn decode_audio_packet(datagram: &[u8]) -> Result<(AudioPacketHeader, &[u8]), PacketError> {
    let header = AudioPacketHeader::decode(datagram)?;
    Ok((header, &datagram[HEADER_SIZE..]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_groesse_ist_12_bytes() {
        assert_eq!(AudioPacketHeader::new(0, 0, 0).encode().len(), 12);
    }

    #[test]
    fn header_big_endian_byte_reihenfolge() {
        let bytes = AudioPacketHeader::new(0x01020304, 0x05060708, 0x090A0B0C).encode();
        assert_eq!(
            bytes,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C]
        );
    }

    #[test]
    fn paket_round_trip_verschiedene_laengen() {
        for laenge in [0usize, 1, 60, 1024] {
            let payload: Vec<u8> = (0..laenge).map(|i| (i % 251) as u8).collect();
            let datagram = encode_audio_packet(7, u32::MAX, 42, &payload);
            assert_eq!(datagram.len(), HEADER_SIZE + laenge);

            let (header, nutzdaten) = decode_audio_packet(&datagram).unwrap();
            assert_eq!(header, AudioPacketHeader::new(7, u32::MAX, 42));
            assert_eq!(nutzdaten, &payload[..]);
        }
    }

    #[test]
    fn zu_kurzes_datagramm_ist_malformed() {
        for laenge in 0..HEADER_SIZE {
            let datagram = vec![0u8; laenge];
            assert_eq!(
                decode_audio_packet(&datagram).unwrap_err(),
                PacketError::MalformedPacket { laenge }
            );
        }
    }

    #[test]
    fn registrierungs_paket_hat_leere_nutzdaten() {
        let datagram = encode_audio_packet(99, 0, 42, &[]);
        assert_eq!(datagram.len(), HEADER_SIZE);

        let (header, nutzdaten) = decode_audio_packet(&datagram).unwrap();
        assert_eq!(header, AudioPacketHeader::new(99, 0, 42));
        assert!(nutzdaten.is_empty());
    }
}
