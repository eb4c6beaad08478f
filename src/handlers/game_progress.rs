use crate::{handlers::parse_game_id, models::{ErrorResponse, ProgressResponse, ProgressUpdate}, AppState};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;

fn is_fraction(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Report a racer's progress.
///
/// An update for a player that is not (or no longer) in the race is accepted
/// and reported back as `applied: false`.
pub async fn game_progress(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(update): Json<ProgressUpdate>,
) -> Result<(StatusCode, Json<ProgressResponse>), (StatusCode, Json<ErrorResponse>)> {
    let id = parse_game_id(&game_id)?;
    if !is_fraction(update.progress) || !is_fraction(update.accuracy) {
        return Err(ErrorResponse::reply(
            StatusCode::BAD_REQUEST,
            "progress and accuracy must be between 0.0 and 1.0",
        ));
    }

    let applied = state.games.record_progress(id, update)?;
    Ok((StatusCode::OK, Json(ProgressResponse { applied })))
}
