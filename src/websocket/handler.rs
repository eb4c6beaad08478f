use std::sync::Arc;
use axum::{
    extract::{Path, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    Json,
};
use tracing::{info, warn};

use crate::{AppState, handlers::parse_game_id, models::ErrorResponse, ws};

/// WebSocket handler
///
/// Rejects unknown games before upgrading. From the upgrade on, the connection
/// is owned by `ws::serve` until the peer goes away or is evicted. The game
/// state greeting is taken only once the socket is ready, together with the
/// registration.
pub async fn websocket_handler(
    Path(game_id): Path<String>,
    State(app_state): State<Arc<AppState>>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    info!("New WebSocket connection attempt for game {}", game_id);
    let id = parse_game_id(&game_id)?;
    app_state.games.ensure_game(id)?;
    let hub = app_state.games.hub();

    Ok(upgrade.on_upgrade(move |socket| {
        ws::serve(hub, id.to_string(), socket, move |handle| match app_state.games.subscribe(id, handle) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping WebSocket for game {}: {}", id, e);
                false
            }
        })
    }))
}
