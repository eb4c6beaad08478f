use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum number of racers admitted into one session.
pub const MAX_PARTICIPANTS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    #[serde(rename = "playing")]
    Active,
    Finished,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Waiting => write!(f, "waiting"),
            SessionStatus::Active => write!(f, "playing"),
            SessionStatus::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub wpm: u32,
    #[serde(default)]
    pub accuracy: f64,
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar: None,
            progress: 0.0,
            wpm: 0,
            accuracy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Progress,
    End,
}

/// One entry of a session's replay log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub player_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// Copy of a session's state taken under its lock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: SessionStatus,
    pub text: String,
    pub players: Vec<Participant>,
    pub replay_data: Vec<Event>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    EmptyText,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::EmptyText => write!(f, "Race text cannot be empty"),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    participants: Vec<Participant>,
    events: Vec<Event>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn activate(&mut self, now: DateTime<Utc>) {
        self.status = SessionStatus::Active;
        self.started_at = Some(now);
    }
}

/// A single race. All state lives behind one mutex that is only held for
/// in-memory mutation and mailbox enqueues, never across I/O or an await point.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a new session with a generated id
    pub fn create(text: &str) -> Result<Self, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyText);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            created_at: Utc::now(),
            state: Mutex::new(SessionState {
                status: SessionStatus::Waiting,
                participants: Vec::new(),
                events: Vec::new(),
                started_at: None,
                finished_at: None,
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Take the session lock. Whatever the caller does before dropping the
    /// guard is ordered against every other change to this session.
    pub fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            session: self,
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }
}

/// Exclusive access to one session's state
pub struct SessionGuard<'a> {
    session: &'a Session,
    state: MutexGuard<'a, SessionState>,
}

impl SessionGuard<'_> {
    /// Admit a participant. Returns false without touching the session when it
    /// is finished, already full, or the id is taken.
    pub fn add_participant(&mut self, participant: Participant) -> bool {
        let state = &mut *self.state;
        if state.status == SessionStatus::Finished
            || state.participants.len() >= MAX_PARTICIPANTS
            || state.participants.iter().any(|p| p.id == participant.id)
        {
            return false;
        }
        state.participants.push(participant);
        if state.status == SessionStatus::Waiting {
            state.activate(Utc::now());
        }
        true
    }

    /// Explicit Waiting -> Active transition
    pub fn start(&mut self) -> bool {
        if self.state.status != SessionStatus::Waiting {
            return false;
        }
        self.state.activate(Utc::now());
        true
    }

    /// Overwrite a participant's metrics and log a progress event. Returns the
    /// participant as stored, with fractions clamped into 0.0..=1.0.
    ///
    /// Unknown participant ids are ignored: a leave racing an in-flight update
    /// is expected, so this reports `None` rather than failing.
    pub fn record_progress(&mut self, participant_id: &str, progress: f64, wpm: u32, accuracy: f64) -> Option<&Participant> {
        let state = &mut *self.state;
        if state.status == SessionStatus::Finished {
            return None;
        }
        let progress = clamp_fraction(progress);
        let accuracy = clamp_fraction(accuracy);
        let index = state.participants.iter().position(|p| p.id == participant_id)?;

        state.events.push(Event {
            timestamp: Utc::now(),
            player_id: Some(participant_id.to_string()),
            kind: EventKind::Progress,
            data: json!({
                "playerId": participant_id,
                "progress": progress,
                "wpm": wpm,
                "accuracy": accuracy,
            }),
        });

        let participant = &mut state.participants[index];
        participant.progress = progress;
        participant.wpm = wpm;
        participant.accuracy = accuracy;
        Some(participant)
    }

    /// Finish the race. Only the first call transitions and logs the end event.
    pub fn end(&mut self) -> bool {
        let state = &mut *self.state;
        if state.status == SessionStatus::Finished {
            return false;
        }
        let now = Utc::now();
        state.events.push(Event {
            timestamp: now,
            player_id: None,
            kind: EventKind::End,
            data: json!({ "endTime": now }),
        });
        state.finished_at = Some(now);
        state.status = SessionStatus::Finished;
        true
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn participant_count(&self) -> usize {
        self.state.participants.len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = &*self.state;
        SessionSnapshot {
            id: self.session.id,
            status: state.status,
            text: self.session.text.clone(),
            players: state.participants.clone(),
            replay_data: state.events.clone(),
            created_at: self.session.created_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
