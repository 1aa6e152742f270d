//! Control-Protokoll (TCP)
//!
//! Definiert die Steuerungsnachrichten die ueber die TCP-Verbindung
//! zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Strikt Request/Response: pro Verbindung ist hoechstens eine Anfrage offen
//! - Kompakte Binaer-Serialisierung via serde + postcard
//! - `ControlEnvelope` ist ein Tagged Enum: Diskriminante und Nutzlast
//!   koennen nicht auseinanderlaufen

use echomesh_core::types::{RoomId, UserId};
use serde::{Deserialize, Serialize};

/// Status-Code einer erfolgreichen Login-Antwort
pub const LOGIN_STATUS_OK: i32 = 0;

// ---------------------------------------------------------------------------
// Auth-Nachrichten
// ---------------------------------------------------------------------------

/// Login-Anfrage vom Client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    /// Klartext, der Server vergleicht
    pub password: String,
}

/// Login-Antwort vom Server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// 0 = Erfolg, alles andere = abgelehnt
    pub status_code: i32,
    /// Vom Server vergebene User-ID (nur bei Erfolg gueltig)
    pub user_id: UserId,
    pub message: String,
}

impl LoginResponse {
    pub fn ist_erfolgreich(&self) -> bool {
        self.status_code == LOGIN_STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// Raum-Nachrichten
// ---------------------------------------------------------------------------

/// Art der Raum-Aktion (Wire-Werte: Create=0, Join=1, Leave=2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomAction {
    Create = 0,
    Join = 1,
    Leave = 2,
}

impl std::fmt::Display for RoomAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoomAction::Create => "create",
            RoomAction::Join => "join",
            RoomAction::Leave => "leave",
        };
        f.write_str(name)
    }
}

/// Raum-Aktion eines eingeloggten Clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomActionRequest {
    pub action: RoomAction,
    pub room_id: RoomId,
    pub user_id: UserId,
}

/// Ergebnis einer Raum-Aktion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Aktion erfolgreich
    Ok,
    RoomNotFound,
    RoomExists,
    NotLoggedIn,
    Error,
}

impl RoomStatus {
    pub fn ist_ok(&self) -> bool {
        matches!(self, RoomStatus::Ok)
    }
}

/// Antwort des Servers auf eine `RoomActionRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomActionResponse {
    pub status_code: RoomStatus,
    pub message: String,
}

/// Chat-Nachricht innerhalb eines Raums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Diskriminante eines `ControlEnvelope` (fuer Logs und Fehlermeldungen)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    LoginRequest,
    LoginResponse,
    RoomActionRequest,
    RoomActionResponse,
    ChatMessage,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Aeussere Wire-Struktur: genau eine Nachricht pro Envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlEnvelope {
    LoginRequest(LoginRequest),
    LoginResponse(LoginResponse),
    RoomActionRequest(RoomActionRequest),
    RoomActionResponse(RoomActionResponse),
    ChatMessage(ChatMessage),
}

impl ControlEnvelope {
    /// Gibt die Nachrichtenart zurueck
    pub fn kind(&self) -> MessageKind {
        match self {
            ControlEnvelope::LoginRequest(_) => MessageKind::LoginRequest,
            ControlEnvelope::LoginResponse(_) => MessageKind::LoginResponse,
            ControlEnvelope::RoomActionRequest(_) => MessageKind::RoomActionRequest,
            ControlEnvelope::RoomActionResponse(_) => MessageKind::RoomActionResponse,
            ControlEnvelope::ChatMessage(_) => MessageKind::ChatMessage,
        }
    }

    /// Erstellt eine Login-Anfrage
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        ControlEnvelope::LoginRequest(LoginRequest {
            username: username.into(),
            password: password.into(),
        })
    }

    /// Erstellt eine Raum-Aktion
    pub fn room_action(action: RoomAction, room_id: RoomId, user_id: UserId) -> Self {
        ControlEnvelope::RoomActionRequest(RoomActionRequest {
            action,
            room_id,
            user_id,
        })
    }

    /// Erstellt eine Chat-Nachricht
    pub fn chat(user_id: UserId, room_id: RoomId, content: impl Into<String>) -> Self {
        ControlEnvelope::ChatMessage(ChatMessage {
            user_id,
            room_id,
            content: content.into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_passt_zur_variante() {
        assert_eq!(
            ControlEnvelope::login("alice", "pw").kind(),
            MessageKind::LoginRequest
        );
        assert_eq!(
            ControlEnvelope::room_action(RoomAction::Join, "roomA".into(), UserId(42)).kind(),
            MessageKind::RoomActionRequest
        );
        assert_eq!(
            ControlEnvelope::chat(UserId(1), "roomA".into(), "hallo").kind(),
            MessageKind::ChatMessage
        );
    }

    #[test]
    fn login_status_auswertung() {
        let ok = LoginResponse {
            status_code: 0,
            user_id: UserId(42),
            message: "ok".into(),
        };
        let abgelehnt = LoginResponse {
            status_code: 1,
            user_id: UserId(0),
            message: "bad credentials".into(),
        };
        assert!(ok.ist_erfolgreich());
        assert!(!abgelehnt.ist_erfolgreich());
    }

    #[test]
    fn room_action_wire_werte() {
        assert_eq!(RoomAction::Create as u8, 0);
        assert_eq!(RoomAction::Join as u8, 1);
        assert_eq!(RoomAction::Leave as u8, 2);
    }

    #[test]
    fn room_action_serialisiert_als_index() {
        // postcard kodiert Unit-Varianten als varint-Index
        assert_eq!(postcard::to_stdvec(&RoomAction::Leave).unwrap(), vec![2]);
    }

    #[test]
    fn nur_ok_ist_erfolg() {
        assert!(RoomStatus::Ok.ist_ok());
        for status in [
            RoomStatus::RoomNotFound,
            RoomStatus::RoomExists,
            RoomStatus::NotLoggedIn,
            RoomStatus::Error,
        ] {
            assert!(!status.ist_ok());
        }
    }
}
