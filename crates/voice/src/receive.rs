//! Empfangs-Aktivitaet: UDP -> Opus -> Lautsprecher
//!
//! Jedes Datagramm wird sofort in Ankunftsreihenfolge abgespielt; es gibt
//! keinen Jitter-Buffer und keine Sequenz-Auswertung. `recv_from` kehrt
//! spaetestens nach dem Socket-Timeout zurueck, damit der Shutdown
//! beobachtet wird.

use std::io;
use std::sync::Arc;

use echomesh_audio::{AudioBackend, PlaybackPipeline, Wiedergabe};
use echomesh_core::ShutdownSignal;
use echomesh_protocol::voice::{decode_audio_packet, EMPFANGSPUFFER_GROESSE};
use tracing::{debug, error, info, trace, warn};

use crate::activity::{Aktivitaet, AktivitaetsEnde};
use crate::socket::{MediaError, MediaResult, MediaSocket};
use crate::stats::MediaStatistik;

/// Name des Empfangs-Threads
pub const THREAD_NAME: &str = "echomesh-recv";

/// Startet die Empfangs-Aktivitaet in einem eigenen Thread
///
/// Lautsprecher und Decoder werden im Thread geoeffnet.
pub fn starte_empfang(
    socket: MediaSocket,
    backend: Arc<dyn AudioBackend>,
    shutdown: ShutdownSignal,
    statistik: Arc<MediaStatistik>,
) -> MediaResult<Aktivitaet> {
    let handle = std::thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || empfangs_loop(&socket, backend.as_ref(), &shutdown, &statistik))
        .map_err(|quelle| MediaError::ThreadStart {
            name: THREAD_NAME,
            quelle,
        })?;

    Ok(Aktivitaet::neu(THREAD_NAME, handle))
}

fn empfangs_loop(
    socket: &MediaSocket,
    backend: &dyn AudioBackend,
    shutdown: &ShutdownSignal,
    statistik: &MediaStatistik,
) -> AktivitaetsEnde {
    let mut pipeline = match PlaybackPipeline::oeffnen(backend) {
        Ok(p) => p,
        Err(e) => {
            error!("Lautsprecher konnte nicht geoeffnet werden: {}", e);
            shutdown.ausloesen();
            return AktivitaetsEnde::Geraetefehler(e.to_string());
        }
    };

    info!("Empfangs-Aktivitaet gestartet");

    let mut buf = vec![0u8; EMPFANGSPUFFER_GROESSE];

    while !shutdown.ist_ausgeloest() {
        let (len, absender) = match socket.socket().recv_from(&mut buf) {
            Ok(ergebnis) => ergebnis,
            Err(e) if ist_timeout(&e) => continue,
            Err(e) => {
                warn!("UDP-Empfangsfehler: {}", e);
                statistik.empfangsfehler();
                continue;
            }
        };
        statistik.paket_empfangen(len);

        let (header, nutzdaten) = match decode_audio_packet(&buf[..len]) {
            Ok(paket) => paket,
            Err(e) => {
                trace!(von = %absender, "{}", e);
                statistik.ungueltiges_paket();
                continue;
            }
        };

        match pipeline.decode_and_play(nutzdaten) {
            Ok(Wiedergabe::Abgespielt) => statistik.frame_abgespielt(),
            Ok(Wiedergabe::Leer) => {
                trace!(user = header.user_id, "Paket ohne Nutzdaten");
                statistik.leeres_paket();
            }
            Ok(Wiedergabe::Verworfen) => statistik.frame_verworfen(),
            Err(e) => {
                error!("Wiedergabe fehlgeschlagen, Empfangs-Aktivitaet endet: {}", e);
                shutdown.ausloesen();
                return AktivitaetsEnde::Geraetefehler(e.to_string());
            }
        }
    }

    debug!("Empfangs-Loop beendet");
    AktivitaetsEnde::Beendet
}

/// Ablauf des Lese-Timeouts (plattformabhaengig WouldBlock oder TimedOut)
fn ist_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use echomesh_audio::testutil::TestBackend;
    use echomesh_protocol::codec::FRAME_SAMPLES;
    use echomesh_protocol::voice::encode_audio_packet;
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    fn warte_bis(bedingung: impl Fn() -> bool) {
        let start = Instant::now();
        while !bedingung() {
            assert!(start.elapsed() < Duration::from_secs(2), "Timeout beim Warten");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn pakete_werden_abgespielt_und_fehler_eingedaemmt() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let media =
            MediaSocket::binden(server.local_addr().unwrap(), Duration::from_millis(20)).unwrap();
        let client_addr = media.lokale_adresse().unwrap();
        let ziel: std::net::SocketAddr = ([127, 0, 0, 1], client_addr.port()).into();

        let backend = TestBackend::endlos();
        let abgespielt = backend.abgespielt();
        let shutdown = ShutdownSignal::neu();
        let stats = Arc::new(MediaStatistik::neu());

        let akt = starte_empfang(
            media,
            Arc::new(backend),
            shutdown.clone(),
            Arc::clone(&stats),
        )
        .unwrap();

        // Zu kurz, Registrierung, nicht dekodierbar, gueltig
        server.send_to(&[1, 2, 3], ziel).unwrap();
        server.send_to(&encode_audio_packet(5, 0, 9, &[]), ziel).unwrap();
        server.send_to(&encode_audio_packet(6, 0, 9, &[1, 2, 3]), ziel).unwrap();
        server.send_to(&encode_audio_packet(7, 0, 9, &[0, 42]), ziel).unwrap();

        warte_bis(|| stats.snapshot().pakete_empfangen == 4);

        let snap = stats.snapshot();
        assert_eq!(snap.ungueltige_pakete, 1);
        assert_eq!(snap.leere_pakete, 1);
        assert_eq!(snap.verworfene_frames, 1);
        assert_eq!(snap.frames_abgespielt, 1);

        let frames = abgespielt.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), FRAME_SAMPLES);
        assert_eq!(frames[0][0], 42);
        drop(frames);

        shutdown.ausloesen();
        assert_eq!(
            akt.beenden(Duration::from_secs(2)),
            Some(AktivitaetsEnde::Beendet)
        );
    }

    #[test]
    fn grosse_datagramme_werden_nicht_gekuerzt() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let media =
            MediaSocket::binden(server.local_addr().unwrap(), Duration::from_millis(20)).unwrap();
        let ziel: std::net::SocketAddr =
            ([127, 0, 0, 1], media.lokale_adresse().unwrap().port()).into();
        let shutdown = ShutdownSignal::neu();
        let stats = Arc::new(MediaStatistik::neu());

        let akt = starte_empfang(
            media,
            Arc::new(TestBackend::endlos()),
            shutdown.clone(),
            Arc::clone(&stats),
        )
        .unwrap();

        let datagram = encode_audio_packet(1, 0, 9, &vec![0xAB; 4000]);
        server.send_to(&datagram, ziel).unwrap();

        warte_bis(|| stats.snapshot().pakete_empfangen == 1);
        let snap = stats.snapshot();
        assert_eq!(snap.bytes_empfangen, datagram.len() as u64);
        assert_eq!(snap.ungueltige_pakete, 0);

        shutdown.ausloesen();
        assert_eq!(
            akt.beenden(Duration::from_secs(2)),
            Some(AktivitaetsEnde::Beendet)
        );
    }

    #[test]
    fn shutdown_ohne_verkehr() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let media =
            MediaSocket::binden(server.local_addr().unwrap(), Duration::from_millis(20)).unwrap();
        let shutdown = ShutdownSignal::neu();

        let akt = starte_empfang(
            media,
            Arc::new(TestBackend::endlos()),
            shutdown.clone(),
            Arc::new(MediaStatistik::neu()),
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        shutdown.ausloesen();

        // Spaetestens ein Socket-Timeout bis zum Ende
        assert_eq!(
            akt.beenden(Duration::from_millis(500)),
            Some(AktivitaetsEnde::Beendet)
        );
    }

    #[test]
    fn timeout_erkennung() {
        assert!(ist_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(ist_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!ist_timeout(&io::Error::from(io::ErrorKind::ConnectionReset)));
    }
}
