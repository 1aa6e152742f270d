//! Gemeinsame Identifikationstypen fuer Echomesh
//!
//! Newtype-Pattern, damit Benutzer- und Raum-Kennungen nicht mit
//! beliebigen Zahlen oder Strings verwechselt werden koennen.

use serde::{Deserialize, Serialize};

/// Vom Server beim Login vergebene Benutzer-ID
///
/// `0` bedeutet "noch nicht eingeloggt".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl UserId {
    /// Platzhalter vor erfolgreichem Login
    pub const UNBEKANNT: UserId = UserId(0);

    /// Gibt den rohen Wert zurueck (z.B. fuer den Audio-Header)
    pub fn get(&self) -> u32 {
        self.0
    }

    /// true solange der Server noch keine ID vergeben hat
    pub fn ist_unbekannt(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl From<u32> for UserId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Raum-Kennung (frei waehlbarer Text, z.B. "roomA")
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_anzeige() {
        assert_eq!(UserId(42).to_string(), "user:42");
    }

    #[test]
    fn user_id_unbekannt() {
        assert!(UserId::default().ist_unbekannt());
        assert!(!UserId(7).ist_unbekannt());
        assert_eq!(UserId::from(7).get(), 7);
    }

    #[test]
    fn room_id_anzeige() {
        let raum = RoomId::from("roomA");
        assert_eq!(raum.to_string(), "roomA");
        assert_eq!(raum.as_str(), "roomA");
    }
}
