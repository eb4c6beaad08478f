use crate::{handlers::parse_game_id, models::{ErrorResponse, SessionSnapshot}, AppState};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;

/// Explicitly start a waiting race
pub async fn game_start(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<(StatusCode, Json<SessionSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    let id = parse_game_id(&game_id)?;
    Ok((StatusCode::OK, Json(state.games.start_game(id)?)))
}
