//! Control-Session – Login und Raumbeitritt ueber TCP
//!
//! Zustandsautomat:
//!
//! ```text
//! Idle -> Connecting -> AwaitingLoginResponse -> LoggedIn
//!      -> AwaitingJoinResponse -> InRoom -> Closed
//! ```
//!
//! `Failed` ist aus jedem nicht-terminalen Zustand erreichbar. Pro
//! Verbindung ist hoechstens eine Anfrage offen; die naechste wird erst
//! nach der passenden Antwort gesendet.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use echomesh_core::types::{RoomId, UserId};
use echomesh_core::{EchomeshError, ShutdownSignal};
use echomesh_protocol::control::{
    ChatMessage, ControlEnvelope, LoginResponse, MessageKind, RoomAction, RoomActionResponse,
    RoomStatus,
};
use echomesh_protocol::wire::{EnvelopeCodec, WireError};

use crate::config::ClientConfig;

// ---------------------------------------------------------------------------
// Phasen
// ---------------------------------------------------------------------------

/// Grund fuer den Zustand `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ConnectionRefused,
    ConnectionLost,
    LoginRejected,
    JoinRejected,
    Protocol,
    /// Lokal abgebrochen bevor `InRoom` erreicht war
    Interrupted,
}

/// Aktueller Zustand der Control-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    AwaitingLoginResponse,
    LoggedIn,
    AwaitingJoinResponse,
    InRoom,
    Closed,
    Failed(FailureReason),
}

impl ConnectionPhase {
    /// `Closed` und `Failed` werden nie mehr verlassen
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(grund) => write!(f, "Failed({grund:?})"),
            andere => std::fmt::Debug::fmt(andere, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler der Control-Session (alle fatal fuer die Session)
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Verbindung zu {adresse} fehlgeschlagen: {quelle}")]
    ConnectionRefused {
        adresse: String,
        #[source]
        quelle: std::io::Error,
    },

    #[error("Control-Verbindung verloren: {0}")]
    ConnectionLost(String),

    #[error("Login abgelehnt (Status {status}): {message}")]
    LoginRejected { status: i32, message: String },

    #[error("Raumbeitritt abgelehnt ({status:?}): {message}")]
    JoinRejected { status: RoomStatus, message: String },

    #[error("Unerwartete Nachricht {erhalten} in Phase {phase}")]
    UnexpectedMessage {
        erhalten: MessageKind,
        phase: ConnectionPhase,
    },

    #[error("Protokollfehler: {0}")]
    Protocol(#[source] WireError),

    #[error("Keine Control-Verbindung in Phase {0}")]
    NichtVerbunden(ConnectionPhase),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn grund(&self) -> FailureReason {
        match self {
            Self::ConnectionRefused { .. } => FailureReason::ConnectionRefused,
            Self::ConnectionLost(_) | Self::NichtVerbunden(_) => FailureReason::ConnectionLost,
            Self::LoginRejected { .. } => FailureReason::LoginRejected,
            Self::JoinRejected { .. } => FailureReason::JoinRejected,
            Self::UnexpectedMessage { .. } | Self::Protocol(_) => FailureReason::Protocol,
        }
    }
}

impl From<WireError> for SessionError {
    fn from(e: WireError) -> Self {
        if e.ist_verbindungsverlust() {
            SessionError::ConnectionLost(e.to_string())
        } else {
            SessionError::Protocol(e)
        }
    }
}

impl From<SessionError> for EchomeshError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::ConnectionRefused { .. } => {
                EchomeshError::VerbindungAbgelehnt(e.to_string())
            }
            SessionError::ConnectionLost(msg) => EchomeshError::Getrennt(msg),
            SessionError::NichtVerbunden(_) => EchomeshError::Getrennt(e.to_string()),
            SessionError::LoginRejected { message, .. } => EchomeshError::LoginAbgelehnt(message),
            SessionError::JoinRejected { message, .. } => {
                EchomeshError::BeitrittAbgelehnt(message)
            }
            SessionError::UnexpectedMessage { .. } | SessionError::Protocol(_) => {
                EchomeshError::UngueltigeNachricht(e.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Zustand der Session
///
/// `user_id` wird genau einmal beim Login gesetzt. Nur das
/// Shutdown-Signal wird mit den Media-Aktivitaeten geteilt.
#[derive(Debug)]
pub struct SessionState {
    phase: ConnectionPhase,
    user_id: UserId,
    room_id: RoomId,
    shutdown: ShutdownSignal,
}

impl SessionState {
    pub fn neu(room_id: RoomId, shutdown: ShutdownSignal) -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            user_id: UserId::UNBEKANNT,
            room_id,
            shutdown,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    fn uebergang(&mut self, neu: ConnectionPhase) {
        if self.phase.ist_terminal() {
            warn!(phase = %self.phase, ziel = %neu, "Uebergang aus terminaler Phase ignoriert");
            return;
        }
        info!(von = %self.phase, nach = %neu, "Session-Phase");
        self.phase = neu;
    }

    fn user_id_setzen(&mut self, user_id: UserId) {
        if self.user_id.ist_unbekannt() {
            self.user_id = user_id;
        }
    }
}

// ---------------------------------------------------------------------------
// ControlSession
// ---------------------------------------------------------------------------

/// TCP-Verbindung zum Server mit Login- und Beitritts-Ablauf
pub struct ControlSession {
    framed: Option<Framed<TcpStream, EnvelopeCodec>>,
    state: SessionState,
    adresse: String,
    username: String,
    password: String,
    create_if_missing: bool,
    max_frame_bytes: usize,
}

impl ControlSession {
    pub fn neu(config: &ClientConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            framed: None,
            state: SessionState::neu(config.room_id(), shutdown),
            adresse: config.server.control_address.clone(),
            username: config.account.username.clone(),
            password: config.account.password.clone(),
            create_if_missing: config.room.create_if_missing,
            max_frame_bytes: config.transport.max_frame_bytes,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.phase
    }

    /// Faehrt die Session bis `InRoom`
    ///
    /// Bei einem Fehler endet die Session in `Failed` und die Verbindung
    /// wird geschlossen.
    pub async fn verbinden_und_beitreten(&mut self) -> SessionResult<()> {
        let ergebnis = self.ablauf().await;
        if let Err(e) = &ergebnis {
            warn!(fehler = %e, "Session fehlgeschlagen");
            self.framed = None;
            self.state.uebergang(ConnectionPhase::Failed(e.grund()));
        }
        ergebnis
    }

    async fn ablauf(&mut self) -> SessionResult<()> {
        // Idle -> Connecting
        self.state.uebergang(ConnectionPhase::Connecting);
        let stream = TcpStream::connect(&self.adresse)
            .await
            .map_err(|quelle| SessionError::ConnectionRefused {
                adresse: self.adresse.clone(),
                quelle,
            })?;
        // Kleine Control-Nachrichten nicht verzoegern
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY nicht gesetzt: {}", e);
        }
        info!(server = %self.adresse, "TCP-Verbindung hergestellt");
        self.framed = Some(Framed::new(
            stream,
            EnvelopeCodec::with_max_size(self.max_frame_bytes),
        ));

        // Connecting -> AwaitingLoginResponse
        let login = ControlEnvelope::login(self.username.clone(), self.password.clone());
        self.senden(login).await?;
        self.state.uebergang(ConnectionPhase::AwaitingLoginResponse);

        // AwaitingLoginResponse -> LoggedIn
        let antwort = self.login_antwort().await?;
        if !antwort.ist_erfolgreich() {
            return Err(SessionError::LoginRejected {
                status: antwort.status_code,
                message: antwort.message,
            });
        }
        self.state.user_id_setzen(antwort.user_id);
        info!(user_id = %antwort.user_id, message = %antwort.message, "Login erfolgreich");
        self.state.uebergang(ConnectionPhase::LoggedIn);

        if self.create_if_missing {
            self.raum_anlegen().await?;
        }

        // LoggedIn -> AwaitingJoinResponse
        self.raum_aktion(RoomAction::Join).await?;
        self.state.uebergang(ConnectionPhase::AwaitingJoinResponse);

        // AwaitingJoinResponse -> InRoom
        let antwort = self.raum_antwort().await?;
        if !antwort.status_code.ist_ok() {
            return Err(SessionError::JoinRejected {
                status: antwort.status_code,
                message: antwort.message,
            });
        }
        info!(room = %self.state.room_id, "Raum beigetreten");
        self.state.uebergang(ConnectionPhase::InRoom);
        Ok(())
    }

    /// `Create` vor dem Beitritt; ein bereits existierender Raum ist kein Fehler
    async fn raum_anlegen(&mut self) -> SessionResult<()> {
        self.raum_aktion(RoomAction::Create).await?;
        let antwort = self.raum_antwort().await?;
        match antwort.status_code {
            RoomStatus::Ok => info!(room = %self.state.room_id, "Raum angelegt"),
            RoomStatus::RoomExists => debug!(room = %self.state.room_id, "Raum existiert bereits"),
            status => {
                return Err(SessionError::JoinRejected {
                    status,
                    message: antwort.message,
                })
            }
        }
        Ok(())
    }

    async fn raum_aktion(&mut self, aktion: RoomAction) -> SessionResult<()> {
        let anfrage =
            ControlEnvelope::room_action(aktion, self.state.room_id.clone(), self.state.user_id);
        self.senden(anfrage).await
    }

    async fn login_antwort(&mut self) -> SessionResult<LoginResponse> {
        match self.antwort_abwarten().await? {
            ControlEnvelope::LoginResponse(antwort) => Ok(antwort),
            andere => Err(self.unerwartet(&andere)),
        }
    }

    async fn raum_antwort(&mut self) -> SessionResult<RoomActionResponse> {
        match self.antwort_abwarten().await? {
            ControlEnvelope::RoomActionResponse(antwort) => Ok(antwort),
            andere => Err(self.unerwartet(&andere)),
        }
    }

    /// Naechste Nachricht die keine Chat-Nachricht ist
    async fn antwort_abwarten(&mut self) -> SessionResult<ControlEnvelope> {
        loop {
            match self.empfangen().await? {
                ControlEnvelope::ChatMessage(chat) => {
                    debug!(von = %chat.user_id, "Chat vor Beitritt ignoriert");
                }
                andere => return Ok(andere),
            }
        }
    }

    fn unerwartet(&self, envelope: &ControlEnvelope) -> SessionError {
        SessionError::UnexpectedMessage {
            erhalten: envelope.kind(),
            phase: self.state.phase,
        }
    }

    async fn senden(&mut self, envelope: ControlEnvelope) -> SessionResult<()> {
        let phase = self.state.phase;
        let framed = self
            .framed
            .as_mut()
            .ok_or(SessionError::NichtVerbunden(phase))?;
        debug!(kind = %envelope.kind(), "Sende Control-Nachricht");
        framed.send(envelope).await?;
        Ok(())
    }

    /// Liest die naechste Nachricht vom Server
    ///
    /// Abbruchsicher: kann in `tokio::select!` verwendet werden.
    pub async fn empfangen(&mut self) -> SessionResult<ControlEnvelope> {
        let phase = self.state.phase;
        let framed = self
            .framed
            .as_mut()
            .ok_or(SessionError::NichtVerbunden(phase))?;
        match framed.next().await {
            Some(Ok(envelope)) => Ok(envelope),
            Some(Err(e)) => Err(e.into()),
            None => Err(SessionError::ConnectionLost(
                "Verbindung vom Server getrennt".into(),
            )),
        }
    }

    /// Sendet eine Chat-Nachricht in den aktuellen Raum
    pub async fn chat_senden(&mut self, inhalt: &str) -> SessionResult<()> {
        let chat =
            ControlEnvelope::chat(self.state.user_id, self.state.room_id.clone(), inhalt);
        self.senden(chat).await
    }

    /// Verlaesst den Raum (ohne auf eine Antwort zu warten) und schliesst
    /// die Verbindung
    pub async fn verlassen_und_schliessen(&mut self) {
        if self.state.phase == ConnectionPhase::InRoom && self.framed.is_some() {
            match self.raum_aktion(RoomAction::Leave).await {
                Ok(()) => debug!(room = %self.state.room_id, "Leave gesendet"),
                Err(e) => warn!(fehler = %e, "Leave konnte nicht gesendet werden"),
            }
        }
        self.schliessen().await;
    }

    /// Schliesst die Verbindung und setzt das Shutdown-Signal
    ///
    /// Aus `InRoom` geht es nach `Closed`; ein Abbruch waehrend Login oder
    /// Beitritt endet in `Failed(Interrupted)`.
    pub async fn schliessen(&mut self) {
        if let Some(mut framed) = self.framed.take() {
            if let Err(e) = framed.close().await {
                debug!("Control-Stream nicht sauber geschlossen: {}", e);
            }
        }
        self.state.shutdown.ausloesen();
        let ziel = match self.state.phase {
            ConnectionPhase::InRoom => ConnectionPhase::Closed,
            _ => ConnectionPhase::Failed(FailureReason::Interrupted),
        };
        self.state.uebergang(ziel);
    }
}

/// Formatiert eine eingehende Chat-Nachricht fuer das Log
pub fn chat_zeile(chat: &ChatMessage) -> String {
    format!("[{}] {}: {}", chat.room_id, chat.user_id, chat.content)
}
