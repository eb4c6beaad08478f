use crate::{handlers::parse_game_id, models::{ErrorResponse, SessionSnapshot}, AppState};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;

/// Fetch one race
pub async fn game_get(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<(StatusCode, Json<SessionSnapshot>), (StatusCode, Json<ErrorResponse>)> {
    let id = parse_game_id(&game_id)?;
    Ok((StatusCode::OK, Json(state.games.get_game(id)?)))
}

/// List every live race
pub async fn game_list(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Vec<SessionSnapshot>>) {
    (StatusCode::OK, Json(state.games.list_games()))
}
