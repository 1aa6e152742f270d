//! UDP Media-Socket
//!
//! Ein Socket pro Client-Prozess; Sende- und Empfangs-Aktivitaet teilen
//! ihn ueber `Arc`. Ziel ist immer die feste Media-Adresse des Servers.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use echomesh_core::types::UserId;
use echomesh_protocol::voice::encode_audio_packet;
use thiserror::Error;
use tracing::{debug, info};

/// Fehler des Media-Transports
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("UDP-Socket konnte nicht gebunden werden: {0}")]
    Binden(#[source] io::Error),

    #[error("Socket-Konfiguration fehlgeschlagen: {0}")]
    Konfiguration(#[source] io::Error),

    #[error("Thread '{name}' konnte nicht gestartet werden: {quelle}")]
    ThreadStart {
        name: &'static str,
        #[source]
        quelle: io::Error,
    },

    #[error("Registrierung fehlgeschlagen: {0}")]
    Registrierung(#[source] io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Gebundener UDP-Socket mit fester Server-Adresse
#[derive(Debug, Clone)]
pub struct MediaSocket {
    socket: Arc<UdpSocket>,
    ziel: SocketAddr,
}

impl MediaSocket {
    /// Bindet einen Socket auf einem vom OS gewaehlten Port
    ///
    /// Die Adressfamilie folgt der Server-Adresse. `empfangs_timeout`
    /// begrenzt jedes `recv_from`, damit die Empfangsseite den
    /// Shutdown bemerkt.
    pub fn binden(ziel: SocketAddr, empfangs_timeout: Duration) -> MediaResult<Self> {
        let lokal: SocketAddr = if ziel.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(lokal).map_err(MediaError::Binden)?;
        socket
            .set_read_timeout(Some(empfangs_timeout.max(Duration::from_millis(1))))
            .map_err(MediaError::Konfiguration)?;

        let media = Self {
            socket: Arc::new(socket),
            ziel,
        };
        info!(
            lokal = ?media.lokale_adresse().ok(),
            server = %ziel,
            "UDP-Socket gebunden"
        );
        Ok(media)
    }

    pub fn lokale_adresse(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn ziel(&self) -> SocketAddr {
        self.ziel
    }

    pub(crate) fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Sendet ein Paket ohne Nutzdaten, damit der Server die
    /// Absender-Adresse dieses Users lernt
    pub fn sende_registrierung(&self, user_id: UserId) -> MediaResult<()> {
        let datagram = encode_audio_packet(0, crate::send::zeitstempel_ms(), user_id.get(), &[]);
        self.socket
            .send_to(&datagram, self.ziel)
            .map_err(MediaError::Registrierung)?;
        debug!(user = %user_id, "Registrierungs-Paket gesendet");
        Ok(())
    }
}
