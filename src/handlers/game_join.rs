use crate::{handlers::parse_game_id, models::{ErrorResponse, JoinGameRequest, Participant, SessionSnapshot}, AppState};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;

/// Join a race. Answers 409 when the race is full or finished.
pub async fn game_join(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(req): Json<JoinGameRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    let id = parse_game_id(&game_id)?;
    if req.id.trim().is_empty() || req.name.trim().is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "Player id and name are required"));
    }

    let mut participant = Participant::new(req.id, req.name);
    participant.avatar = req.avatar;
    Ok((StatusCode::OK, Json(state.games.join_game(id, participant)?)))
}
