use crate::{models::{CreateGameRequest, ErrorResponse, SessionSnapshot}, AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

/// Set up a new race
pub async fn game_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    let snapshot = state.games.create_game(&req.text)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}
