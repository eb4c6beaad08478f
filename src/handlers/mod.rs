pub mod health;
pub mod diagnostics;
pub mod game_create;
pub mod game_get;
pub mod game_join;
pub mod game_start;
pub mod game_progress;
pub mod game_end;

pub use health::*;
pub use diagnostics::*;
pub use game_create::*;
pub use game_get::*;
pub use game_join::*;
pub use game_start::*;
pub use game_progress::*;
pub use game_end::*;

use axum::{http::StatusCode, Json};
use tracing::error;
use uuid::Uuid;
use crate::models::ErrorResponse;

/// Parse a game id from the request path
pub fn parse_game_id(game_id: &str) -> Result<Uuid, (StatusCode, Json<ErrorResponse>)> {
    Uuid::parse_str(game_id).map_err(|e| {
        error!("Invalid game UUID '{}': {}", game_id, e);
        ErrorResponse::reply(StatusCode::BAD_REQUEST, format!("Invalid game UUID '{}'", game_id))
    })
}
