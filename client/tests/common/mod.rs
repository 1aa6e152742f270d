//! Gemeinsame Hilfen fuer die Integrationstests: Fake-Server fuer
//! Control- und Media-Kanal

#![allow(dead_code)]

use std::time::Duration;

use echomesh_client::ClientConfig;
use echomesh_core::UserId;
use echomesh_protocol::control::{
    ControlEnvelope, LoginResponse, RoomActionResponse, RoomStatus,
};
use echomesh_protocol::wire::EnvelopeCodec;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::codec::Framed;

pub type ServerConn = Framed<TcpStream, EnvelopeCodec>;

/// Lokaler Control-Listener + Media-Socket und passende Client-Konfiguration
pub async fn fake_server() -> (TcpListener, UdpSocket, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let media = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut config = ClientConfig::default();
    config.server.control_address = listener.local_addr().unwrap().to_string();
    config.server.media_address = media.local_addr().unwrap().to_string();
    config.account.username = "alice".into();
    config.account.password = "pw".into();
    config.room.room_id = "roomA".into();
    config.transport.receive_timeout_ms = 20;
    config.transport.shutdown_grace_ms = 1000;

    (listener, media, config)
}

pub async fn annehmen(listener: &TcpListener) -> ServerConn {
    let (stream, _) = listener.accept().await.unwrap();
    Framed::new(stream, EnvelopeCodec::new())
}

pub async fn naechste(conn: &mut ServerConn) -> ControlEnvelope {
    tokio::time::timeout(Duration::from_secs(3), conn.next())
        .await
        .expect("Timeout beim Warten auf Control-Nachricht")
        .expect("Verbindung geschlossen")
        .expect("Dekodierfehler")
}

pub fn login_ok(user_id: u32) -> ControlEnvelope {
    ControlEnvelope::LoginResponse(LoginResponse {
        status_code: 0,
        user_id: UserId(user_id),
        message: "ok".into(),
    })
}

pub fn raum_antwort(status: RoomStatus, message: &str) -> ControlEnvelope {
    ControlEnvelope::RoomActionResponse(RoomActionResponse {
        status_code: status,
        message: message.into(),
    })
}
