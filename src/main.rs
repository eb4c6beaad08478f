mod models;
mod handlers;
mod routes;
mod docs;
mod websocket;
mod config;
mod services;
mod utils;
mod ws;

use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use routes::api::create_api_routes;
use docs::ApiDoc;
use config::Config;
use services::{GameService, SessionStore};
use tracing::{info, error, warn};
use tracing_subscriber::{fmt, prelude::*};
use std::panic;
use ws::Hub;

/// Shared state handed to every handler
pub struct AppState {
    pub config: Config,
    pub games: GameService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let hub = Arc::new(Hub::new(config.mailbox_capacity));
        let store = SessionStore::new(config.max_sessions, config.session_idle());
        Self {
            games: GameService::new(store, hub),
            config,
        }
    }
}

fn cors_layer(config: &Config) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        Some(CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any))
    } else if config.is_development() {
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first, LOG_LEVEL feeds the tracing filter
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(config.log_filter())
        .init();

    info!("Starting server...");
    match loaded {
        Ok(_) => info!("✅ Configuration loaded successfully"),
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }
    let address = config.server_address();
    let cors = cors_layer(&config);

    // Shared hub, session store and game service
    let state = Arc::new(AppState::new(config));

    // Combine all routes
    let mut app_routes = Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http());
    if let Some(cors) = cors {
        app_routes = app_routes.layer(cors);
    }

    // Start the HTTP/API server
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/api/ws/{{gameId}}", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
