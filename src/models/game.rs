use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to set up a new race
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct CreateGameRequest {
    pub text: String,
}

/// Racer descriptor supplied when joining
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct JoinGameRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Whether a progress report matched a current participant
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProgressResponse {
    pub applied: bool,
}
