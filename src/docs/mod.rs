use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Hub and host diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current occupancy and host stats", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Create a new race
#[utoipa::path(
    post,
    path = "/api/games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Race created", body = SessionSnapshot),
        (status = 400, description = "Race text is empty", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn game_create_doc() {}

/// List live races
#[utoipa::path(
    get,
    path = "/api/games",
    responses(
        (status = 200, description = "All live races", body = [SessionSnapshot])
    )
)]
#[allow(dead_code)]
pub async fn game_list_doc() {}

/// Fetch a race
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    params(("id" = String, Path, description = "Race UUID")),
    responses(
        (status = 200, description = "Race state", body = SessionSnapshot),
        (status = 404, description = "Unknown race", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn game_get_doc() {}

/// Join a race
#[utoipa::path(
    post,
    path = "/api/games/{id}/join",
    params(("id" = String, Path, description = "Race UUID")),
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined", body = SessionSnapshot),
        (status = 404, description = "Unknown race", body = ErrorResponse),
        (status = 409, description = "Race is full or finished", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn game_join_doc() {}

/// Start a waiting race
#[utoipa::path(
    post,
    path = "/api/games/{id}/start",
    params(("id" = String, Path, description = "Race UUID")),
    responses(
        (status = 200, description = "Started", body = SessionSnapshot),
        (status = 409, description = "Race is not waiting", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn game_start_doc() {}

/// Report racer progress
#[utoipa::path(
    post,
    path = "/api/games/{id}/progress",
    params(("id" = String, Path, description = "Race UUID")),
    request_body = ProgressUpdate,
    responses(
        (status = 200, description = "Whether the update matched a racer", body = ProgressResponse),
        (status = 400, description = "Fractions out of range", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn game_progress_doc() {}

/// Finish a race
#[utoipa::path(
    post,
    path = "/api/games/{id}/end",
    params(("id" = String, Path, description = "Race UUID")),
    responses(
        (status = 200, description = "Finished race", body = SessionSnapshot)
    )
)]
#[allow(dead_code)]
pub async fn game_end_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        diagnostics_doc,
        game_create_doc,
        game_list_doc,
        game_get_doc,
        game_join_doc,
        game_start_doc,
        game_progress_doc,
        game_end_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            CreateGameRequest,
            JoinGameRequest,
            ProgressUpdate,
            ProgressResponse,
            SessionSnapshot,
            SessionStatus,
            Participant,
            Event,
            EventKind,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
