//! Lobby service - places connecting players into running sessions

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::game::{GameSession, SessionHandle, SessionRegistry, SessionSettings};

/// Why a player could not be seated
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("Player {0} is already in a session")]
    AlreadySeated(Uuid),

    #[error("Session {0} not found")]
    UnknownSession(Uuid),

    #[error("Session {0} is full")]
    SessionFull(Uuid),
}

/// Drop-in lobby: every player goes to a session with room, and a new
/// session is started when none has any
pub struct LobbyService {
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
    /// Map of player -> current session
    player_sessions: Arc<DashMap<Uuid, Uuid>>,
}

impl LobbyService {
    pub fn new(registry: Arc<SessionRegistry>, settings: SessionSettings) -> Self {
        Self {
            registry,
            settings,
            player_sessions: Arc::new(DashMap::new()),
        }
    }

    /// Seat a player, in `preferred` if given, otherwise anywhere with room
    pub fn assign(&self, user_id: Uuid, preferred: Option<Uuid>) -> Result<SessionHandle, LobbyError> {
        if self.player_sessions.contains_key(&user_id) {
            return Err(LobbyError::AlreadySeated(user_id));
        }

        let max_players = self.settings.max_players;
        let handle = match preferred {
            Some(session_id) => {
                let handle = self
                    .registry
                    .get(&session_id)
                    .ok_or(LobbyError::UnknownSession(session_id))?;
                if !handle.try_claim_seat(max_players) {
                    return Err(LobbyError::SessionFull(session_id));
                }
                handle
            }
            None => match self.registry.claim_seat(max_players) {
                Some(handle) => handle,
                None => {
                    let handle = self.create_session();
                    // Fresh session, the first seat is always free
                    handle.try_claim_seat(max_players);
                    handle
                }
            },
        };

        self.player_sessions.insert(user_id, handle.id);
        info!(user_id = %user_id, session_id = %handle.id, "Player seated");
        Ok(handle)
    }

    /// Give back a player's seat (called when the WebSocket disconnects)
    pub fn release(&self, user_id: Uuid) {
        if let Some((_, session_id)) = self.player_sessions.remove(&user_id) {
            if let Some(handle) = self.registry.get(&session_id) {
                handle.release_seat();
            }
            info!(user_id = %user_id, session_id = %session_id, "Player released from lobby");
        }
    }

    pub fn seated_players(&self) -> usize {
        self.player_sessions.len()
    }

    /// Start a session task and register it until it ends
    fn create_session(&self) -> SessionHandle {
        let session_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (session, handle) = GameSession::new(session_id, seed, self.settings);
        self.registry.insert(handle.clone());

        info!(session_id = %session_id, seed, "Created new session");

        let registry = self.registry.clone();
        let player_sessions = self.player_sessions.clone();
        tokio::spawn(async move {
            session.run().await;

            // Cleanup after session ends, including seats nobody used
            registry.remove(&session_id);
            player_sessions.retain(|_, seated_in| *seated_in != session_id);
            info!(session_id = %session_id, "Session removed from registry");
        });

        handle
    }
}
