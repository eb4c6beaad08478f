use crate::{
    handlers::{diagnostics, game_create, game_end, game_get, game_join, game_list, game_progress, game_start, health_check, ready_check},
    websocket::handler::websocket_handler,
    AppState,
};
use axum::{routing::{get, post}, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/games", get(game_list).post(game_create))
        .route("/games/:id", get(game_get))
        .route("/games/:id/join", post(game_join))
        .route("/games/:id/start", post(game_start))
        .route("/games/:id/progress", post(game_progress))
        .route("/games/:id/end", post(game_end))
        .route("/ws/:game_id", get(websocket_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use crate::config::Config;

    fn app() -> Router {
        create_api_routes(Arc::new(AppState::new(Config::default())))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn create(app: &Router, text: &str) -> String {
        let (status, body) = call(app, "POST", "/games", Some(json!({ "text": text }))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let (status, body) = call(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "typerace-hub");
    }

    #[tokio::test]
    async fn create_and_fetch_game() {
        let app = app();
        let id = create(&app, "the quick brown fox").await;

        let (status, body) = call(&app, "GET", &format!("/games/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "waiting");
        assert_eq!(body["text"], "the quick brown fox");

        let (status, body) = call(&app, "GET", "/games", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_ids_and_blank_text_are_rejected() {
        let app = app();
        let (status, body) = call(&app, "GET", "/games/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);

        let (status, _) = call(&app, "GET", &format!("/games/{}", uuid::Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "POST", "/games", Some(json!({ "text": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fifth_join_conflicts() {
        let app = app();
        let id = create(&app, "the quick brown fox").await;
        for i in 0..4 {
            let (status, body) = call(&app, "POST", &format!("/games/{id}/join"), Some(json!({ "id": format!("p{i}"), "name": "racer" }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["players"].as_array().unwrap().len(), i + 1);
        }
        let (status, body) = call(&app, "POST", &format!("/games/{id}/join"), Some(json!({ "id": "p4", "name": "late" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], 409);

        let (_, body) = call(&app, "GET", &format!("/games/{id}"), None).await;
        assert_eq!(body["players"].as_array().unwrap().len(), 4);
        assert_eq!(body["status"], "playing");
    }

    #[tokio::test]
    async fn progress_soft_fails_for_unknown_player() {
        let app = app();
        let id = create(&app, "the quick brown fox").await;
        call(&app, "POST", &format!("/games/{id}/join"), Some(json!({ "id": "p1", "name": "Ann" }))).await;

        let uri = format!("/games/{id}/progress");
        let (status, body) = call(&app, "POST", &uri, Some(json!({ "playerId": "p1", "progress": 0.5, "wpm": 70, "accuracy": 0.96 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);

        let (status, body) = call(&app, "POST", &uri, Some(json!({ "playerId": "ghost", "progress": 0.5, "wpm": 70, "accuracy": 0.96 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], false);

        let (status, _) = call(&app, "POST", &uri, Some(json!({ "playerId": "p1", "progress": 1.5, "wpm": 70, "accuracy": 0.96 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "GET", &format!("/games/{id}"), None).await;
        assert_eq!(body["replayData"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn end_is_idempotent_and_closes_the_game() {
        let app = app();
        let id = create(&app, "the quick brown fox").await;

        let (status, body) = call(&app, "POST", &format!("/games/{id}/start"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "playing");
        let (status, _) = call(&app, "POST", &format!("/games/{id}/start"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        for _ in 0..2 {
            let (status, body) = call(&app, "POST", &format!("/games/{id}/end"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "finished");
            assert_eq!(body["replayData"].as_array().unwrap().len(), 1);
            assert_eq!(body["replayData"][0]["type"], "end");
        }

        let (status, _) = call(&app, "POST", &format!("/games/{id}/join"), Some(json!({ "id": "p1", "name": "Ann" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
