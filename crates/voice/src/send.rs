//! Sende-Aktivitaet: Mikrofon -> Opus -> UDP
//!
//! Der Takt ergibt sich aus dem blockierenden Capture (20 ms pro
//! Iteration). Ein Geraetefehler beendet die Aktivitaet und loest den
//! Shutdown aus.

use std::sync::Arc;

use echomesh_audio::{AudioBackend, CapturePipeline};
use echomesh_core::types::UserId;
use echomesh_core::ShutdownSignal;
use echomesh_protocol::voice::encode_audio_packet;
use tracing::{debug, error, info, trace, warn};

use crate::activity::{Aktivitaet, AktivitaetsEnde};
use crate::socket::{MediaError, MediaResult, MediaSocket};
use crate::stats::MediaStatistik;

/// Name des Sende-Threads
pub const THREAD_NAME: &str = "echomesh-send";

/// Aktuelle Zeit in Millisekunden seit UNIX-Epoche, auf 32 Bit gekuerzt
pub fn zeitstempel_ms() -> u32 {
    chrono::Utc::now().timestamp_millis() as u32
}

/// Startet die Sende-Aktivitaet in einem eigenen Thread
///
/// Mikrofon und Encoder werden im Thread geoeffnet.
pub fn starte_senden(
    socket: MediaSocket,
    user_id: UserId,
    backend: Arc<dyn AudioBackend>,
    shutdown: ShutdownSignal,
    statistik: Arc<MediaStatistik>,
) -> MediaResult<Aktivitaet> {
    let handle = std::thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || sende_loop(&socket, user_id, backend.as_ref(), &shutdown, &statistik))
        .map_err(|quelle| MediaError::ThreadStart {
            name: THREAD_NAME,
            quelle,
        })?;

    Ok(Aktivitaet::neu(THREAD_NAME, handle))
}

fn sende_loop(
    socket: &MediaSocket,
    user_id: UserId,
    backend: &dyn AudioBackend,
    shutdown: &ShutdownSignal,
    statistik: &MediaStatistik,
) -> AktivitaetsEnde {
    let mut pipeline = match CapturePipeline::oeffnen(backend) {
        Ok(p) => p,
        Err(e) => {
            error!("Mikrofon konnte nicht geoeffnet werden: {}", e);
            shutdown.ausloesen();
            return AktivitaetsEnde::Geraetefehler(e.to_string());
        }
    };

    info!(user = %user_id, server = %socket.ziel(), "Sende-Aktivitaet gestartet");

    let mut sequence: u32 = 0;

    while !shutdown.ist_ausgeloest() {
        let nutzdaten = match pipeline.capture_and_encode() {
            Ok(bytes) => bytes,
            Err(e) if e.ist_geraetefehler() => {
                error!("Capture fehlgeschlagen, Sende-Aktivitaet endet: {}", e);
                shutdown.ausloesen();
                return AktivitaetsEnde::Geraetefehler(e.to_string());
            }
            Err(e) => {
                warn!("Opus-Encoding fehlgeschlagen: {}", e);
                statistik.kodierfehler();
                continue;
            }
        };

        let datagram = encode_audio_packet(sequence, zeitstempel_ms(), user_id.get(), &nutzdaten);
        match socket.socket().send_to(&datagram, socket.ziel()) {
            Ok(n) => {
                trace!(seq = sequence, bytes = n, "Audio-Paket gesendet");
                statistik.paket_gesendet(n);
            }
            Err(e) => {
                warn!("UDP-Sendefehler: {}", e);
                statistik.sendefehler();
            }
        }
        sequence = sequence.wrapping_add(1);
    }

    debug!("Sende-Loop beendet nach {} Paketen", sequence);
    AktivitaetsEnde::Beendet
}

#[cfg(test)]
mod tests {
    use super::*;
    use echomesh_audio::testutil::TestBackend;
    use echomesh_protocol::voice::decode_audio_packet;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn test_server() -> UdpSocket {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        server
    }

    #[test]
    fn sequenz_beginnt_bei_null_und_steigt() {
        let server = test_server();
        let media =
            MediaSocket::binden(server.local_addr().unwrap(), Duration::from_millis(20)).unwrap();
        let shutdown = ShutdownSignal::neu();
        let stats = Arc::new(MediaStatistik::neu());

        let akt = starte_senden(
            media,
            UserId(42),
            Arc::new(TestBackend::mit_frames(3)),
            shutdown.clone(),
            Arc::clone(&stats),
        )
        .unwrap();

        let mut buf = [0u8; 2048];
        for erwartet in 0..3u32 {
            let (len, _) = server.recv_from(&mut buf).unwrap();
            let (header, nutzdaten) = decode_audio_packet(&buf[..len]).unwrap();
            assert_eq!(header.sequence, erwartet);
            assert_eq!(header.user_id, 42);
            assert!(!nutzdaten.is_empty());
        }

        // Nach drei Frames meldet die Testquelle einen Geraetefehler
        let ende = akt.beenden(Duration::from_secs(2)).unwrap();
        assert!(matches!(ende, AktivitaetsEnde::Geraetefehler(_)));
        assert!(shutdown.ist_ausgeloest());
        assert_eq!(stats.snapshot().pakete_gesendet, 3);
    }

    #[test]
    fn shutdown_beendet_sende_loop() {
        let server = test_server();
        let media =
            MediaSocket::binden(server.local_addr().unwrap(), Duration::from_millis(20)).unwrap();
        let shutdown = ShutdownSignal::neu();

        let akt = starte_senden(
            media,
            UserId(7),
            Arc::new(TestBackend::endlos()),
            shutdown.clone(),
            Arc::new(MediaStatistik::neu()),
        )
        .unwrap();

        let mut buf = [0u8; 2048];
        server.recv_from(&mut buf).unwrap();

        shutdown.ausloesen();
        assert_eq!(
            akt.beenden(Duration::from_secs(2)),
            Some(AktivitaetsEnde::Beendet)
        );
    }

    #[test]
    fn fehlendes_mikrofon_beendet_sofort() {
        let server = test_server();
        let media =
            MediaSocket::binden(server.local_addr().unwrap(), Duration::from_millis(20)).unwrap();
        let shutdown = ShutdownSignal::neu();

        let akt = starte_senden(
            media,
            UserId(7),
            Arc::new(TestBackend::ohne_geraete()),
            shutdown.clone(),
            Arc::new(MediaStatistik::neu()),
        )
        .unwrap();

        let ende = akt.beenden(Duration::from_secs(2)).unwrap();
        assert!(matches!(ende, AktivitaetsEnde::Geraetefehler(_)));
        assert!(shutdown.ist_ausgeloest());
    }
}
