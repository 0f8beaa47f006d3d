//! Axum router configuration

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{
    health_check, list_channels, live_playlist, logout, render_playlist, send_otp, verify_otp,
    version_check,
};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors_enabled = state.config.cors_enabled;

    let router = Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Catalog and manifests
        .route("/channels", get(list_channels))
        .route("/live/{channel_id}", get(live_playlist))
        .route("/render.m3u8", get(render_playlist))
        // Session
        .route("/login/sendOTP", post(send_otp))
        .route("/login/verifyOTP", post(verify_otp))
        .route("/logout", get(logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if !cors_enabled {
        return router;
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::HEAD])
        .allow_headers([header::ACCEPT, header::RANGE, header::CONTENT_TYPE, header::ORIGIN])
        .max_age(Duration::from_secs(3600));
    router.layer(cors)
}
