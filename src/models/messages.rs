use std::sync::Arc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::{Participant, SessionSnapshot};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub player_id: String,
    pub progress: f64,
    pub wpm: u32,
    pub accuracy: f64,
}

/// Everything the hub pushes to peers: `{"type": ..., "data": ...}`
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum OutboundMessage {
    GameState(SessionSnapshot),
    PlayerJoined(Participant),
    GameStarted(SessionSnapshot),
    Progress(ProgressUpdate),
    GameEnd(SessionSnapshot),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::GameState(_) => "gameState",
            OutboundMessage::PlayerJoined(_) => "playerJoined",
            OutboundMessage::GameStarted(_) => "gameStarted",
            OutboundMessage::Progress(_) => "progress",
            OutboundMessage::GameEnd(_) => "gameEnd",
        }
    }
}

/// Serialize a message once so it can be shared by every mailbox it is queued on
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Arc<str>, serde_json::Error> {
    serde_json::to_string(message).map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;

    #[test]
    fn progress_message_is_type_and_data() {
        let msg = OutboundMessage::Progress(ProgressUpdate {
            player_id: "p1".to_string(),
            progress: 0.5,
            wpm: 72,
            accuracy: 0.97,
        });
        let value: serde_json::Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["data"]["playerId"], "p1");
        assert_eq!(value["data"]["wpm"], 72);
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn discriminators_match_kind() {
        let session = Session::create("text").unwrap();
        let snapshot = session.snapshot();
        let messages = vec![
            OutboundMessage::GameState(snapshot.clone()),
            OutboundMessage::PlayerJoined(Participant::new("a", "A")),
            OutboundMessage::GameStarted(snapshot.clone()),
            OutboundMessage::GameEnd(snapshot),
        ];
        for msg in messages {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["type"], msg.kind());
            assert!(value.get("data").is_some());
        }
    }
}
