use std::fmt;
use std::sync::Arc;
use axum::{http::StatusCode, Json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    encode, ErrorResponse, OutboundMessage, MAX_PARTICIPANTS, Participant, ProgressUpdate, Session, SessionError, SessionSnapshot,
    SessionStatus,
};
use crate::ws::{connection::ClientHandle, Hub};
use super::session_store::SessionStore;

#[derive(Debug)]
pub enum GameError {
    InvalidText(SessionError),
    NotFound(Uuid),
    /// Session is full, finished, or already has a racer with this id
    SessionUnavailable(Uuid),
    InvalidState { id: Uuid, status: SessionStatus },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidText(e) => write!(f, "{}", e),
            GameError::NotFound(id) => write!(f, "Game '{}' not found", id),
            GameError::SessionUnavailable(id) => write!(f, "Game '{}' is full or finished", id),
            GameError::InvalidState { id, status } => write!(f, "Game '{}' is {}", id, status),
        }
    }
}

impl std::error::Error for GameError {}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::InvalidText(_) => StatusCode::BAD_REQUEST,
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::SessionUnavailable(_) | GameError::InvalidState { .. } => StatusCode::CONFLICT,
        }
    }
}

impl From<GameError> for (StatusCode, Json<ErrorResponse>) {
    fn from(e: GameError) -> Self {
        ErrorResponse::reply(e.status_code(), e.to_string())
    }
}

/// Applies race lifecycle requests to sessions and fans the results out
/// through the hub. Each successful mutation produces exactly one broadcast.
///
/// Broadcasts are queued while the session is still locked, so every peer
/// sees a session's changes in the order they were logged. The lock order is
/// always session, then hub.
pub struct GameService {
    store: SessionStore,
    hub: Arc<Hub>,
}

impl GameService {
    pub fn new(store: SessionStore, hub: Arc<Hub>) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    pub fn stored_sessions(&self) -> u64 {
        self.store.len()
    }

    fn session(&self, id: Uuid) -> Result<Arc<Session>, GameError> {
        self.store.get(&id).ok_or(GameError::NotFound(id))
    }

    fn broadcast(&self, id: Uuid, message: &OutboundMessage) {
        let delivered = self.hub.broadcast_to_session(&id.to_string(), message);
        debug!("Broadcast {} for game {} reached {} connection(s)", message.kind(), id, delivered);
    }

    pub fn create_game(&self, text: &str) -> Result<SessionSnapshot, GameError> {
        let session = Arc::new(Session::create(text).map_err(GameError::InvalidText)?);
        let snapshot = session.snapshot();
        self.store.insert(session);
        info!("Created game {}", snapshot.id);
        Ok(snapshot)
    }

    /// Fails with `NotFound` unless the game is live
    pub fn ensure_game(&self, id: Uuid) -> Result<(), GameError> {
        self.session(id).map(|_| ())
    }

    pub fn get_game(&self, id: Uuid) -> Result<SessionSnapshot, GameError> {
        Ok(self.session(id)?.snapshot())
    }

    pub fn list_games(&self) -> Vec<SessionSnapshot> {
        let mut games: Vec<_> = self.store.list().iter().map(|s| s.snapshot()).collect();
        games.sort_by_key(|g| g.created_at);
        games
    }

    pub fn join_game(&self, id: Uuid, participant: Participant) -> Result<SessionSnapshot, GameError> {
        let session = self.session(id)?;
        let mut state = session.lock();
        if !state.add_participant(participant.clone()) {
            info!("Rejected join of {} into game {}", participant.id, id);
            return Err(GameError::SessionUnavailable(id));
        }
        info!("Player {} joined game {} ({}/{})", participant.id, id, state.participant_count(), MAX_PARTICIPANTS);
        self.broadcast(id, &OutboundMessage::PlayerJoined(participant));
        Ok(state.snapshot())
    }

    pub fn start_game(&self, id: Uuid) -> Result<SessionSnapshot, GameError> {
        let session = self.session(id)?;
        let mut state = session.lock();
        if !state.start() {
            return Err(GameError::InvalidState { id, status: state.status() });
        }
        let snapshot = state.snapshot();
        info!("Game {} started", id);
        self.broadcast(id, &OutboundMessage::GameStarted(snapshot.clone()));
        Ok(snapshot)
    }

    /// Returns whether the update matched a current participant. Unmatched
    /// updates are not broadcast. The broadcast carries the values as stored.
    pub fn record_progress(&self, id: Uuid, update: ProgressUpdate) -> Result<bool, GameError> {
        let session = self.session(id)?;
        let mut state = session.lock();
        let Some(applied) = state.record_progress(&update.player_id, update.progress, update.wpm, update.accuracy) else {
            debug!("Ignored progress for unknown player {} in game {}", update.player_id, id);
            return Ok(false);
        };
        let applied = ProgressUpdate {
            player_id: applied.id.clone(),
            progress: applied.progress,
            wpm: applied.wpm,
            accuracy: applied.accuracy,
        };
        self.broadcast(id, &OutboundMessage::Progress(applied));
        Ok(true)
    }

    /// Idempotent. Only the call that actually finishes the game broadcasts.
    pub fn end_game(&self, id: Uuid) -> Result<SessionSnapshot, GameError> {
        let session = self.session(id)?;
        let mut state = session.lock();
        let transitioned = state.end();
        let snapshot = state.snapshot();
        if transitioned {
            info!("Game {} finished", id);
            self.broadcast(id, &OutboundMessage::GameEnd(snapshot.clone()));
        }
        Ok(snapshot)
    }

    /// Attach a new peer to a game.
    ///
    /// The `gameState` snapshot is queued and the peer registered under the
    /// session lock, so no change can fall between the snapshot and the first
    /// broadcast the peer receives.
    pub fn subscribe(&self, id: Uuid, handle: ClientHandle) -> Result<(), GameError> {
        let session = self.session(id)?;
        let state = session.lock();
        match encode(&OutboundMessage::GameState(state.snapshot())) {
            Ok(payload) => {
                if let Err(e) = handle.send(payload) {
                    warn!("Failed to queue game state for connection {}: {}", handle.id(), e);
                }
            }
            Err(e) => error!("Failed to serialize game state for {}: {}", id, e),
        }
        self.hub.register(handle);
        Ok(())
    }
}
