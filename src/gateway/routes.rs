use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{callback, login, refresh_token};
use crate::app_state::AppState;
use crate::shared::time::now_unix_seconds;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: &'static str,
    version: &'static str,
    ts: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "spotify-auth",
        version: env!("CARGO_PKG_VERSION"),
        ts: now_unix_seconds(),
    })
}

async fn root() -> &'static str {
    "Spotify auth server is running"
}

pub(crate) fn build_router(state: AppState) -> Router {
    let static_dir = state.settings.static_dir.clone();

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/refresh_token", get(refresh_token));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
