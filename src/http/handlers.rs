//! HTTP request handlers
//!
//! Thin wrappers over `AppState`; all relay logic lives in the core modules.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::RelayError;
use crate::state::{AppState, RelayedManifest};

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    Unauthorized(String),
    BadGateway(String),
    BadRequest(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            HttpError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "status": status.as_u16(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        HttpError::from(&err)
    }
}

impl From<&RelayError> for HttpError {
    fn from(err: &RelayError) -> Self {
        if err.is_auth_failure() {
            return HttpError::Unauthorized(err.to_string());
        }
        match err {
            RelayError::Shared(inner) => HttpError::from(inner.as_ref()),
            RelayError::Transport(_)
            | RelayError::UpstreamRejected { .. }
            | RelayError::MalformedResponse { .. } => HttpError::BadGateway(err.to_string()),
            RelayError::Codec(_) | RelayError::Config(_) => HttpError::BadRequest(err.to_string()),
            RelayError::ChannelNotFound(_) => HttpError::NotFound(err.to_string()),
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

fn playlist_response(manifest: RelayedManifest) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Content-Type",
        HeaderValue::from_static("application/vnd.apple.mpegurl"),
    );
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

    (headers, manifest.body).into_response()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("livetv-relay v", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelFilter {
    #[serde(default)]
    pub language: i32,
    #[serde(default)]
    pub category: i32,
}

/// Channel catalog
/// GET /channels?language=&category=
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ChannelFilter>,
) -> Result<Response, HttpError> {
    let channels = state
        .channel_catalog(filter.language, filter.category)
        .await?;

    Ok(Json(serde_json::json!({ "result": channels })).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveParams {
    pub q: Option<String>,
}

/// Live channel manifest
/// GET /live/{channel_id}?q=
pub async fn live_playlist(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Query(params): Query<LiveParams>,
) -> Result<Response, HttpError> {
    let manifest = state
        .live_manifest(&channel_id, non_empty(&params.q))
        .await?;
    tracing::debug!("Relayed live manifest for channel {}", channel_id);

    Ok(playlist_response(manifest))
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderParams {
    pub auth: Option<String>,
    pub channel_key_id: Option<String>,
    pub q: Option<String>,
}

/// Nested playlist behind an opaque token
/// GET /render.m3u8?auth=&channel_key_id=&q=
pub async fn render_playlist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RenderParams>,
) -> Result<Response, HttpError> {
    let auth = non_empty(&params.auth)
        .ok_or_else(|| HttpError::BadRequest("missing auth parameter".to_string()))?;

    let manifest = state
        .render_playlist(auth, non_empty(&params.channel_key_id), non_empty(&params.q))
        .await?;

    Ok(playlist_response(manifest))
}

#[derive(Debug, Deserialize)]
pub struct SendOtpBody {
    pub number: String,
}

/// POST /login/sendOTP
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendOtpBody>,
) -> Result<Response, HttpError> {
    state.login.send_otp(&body.number).await?;
    Ok(Json(serde_json::json!({ "status": true })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub number: String,
    pub otp: String,
}

/// POST /login/verifyOTP
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyOtpBody>,
) -> Result<Response, HttpError> {
    state.login.verify_otp(&body.number, &body.otp).await?;
    Ok(Json(serde_json::json!({ "status": "success" })).into_response())
}

/// GET /logout
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<Response, HttpError> {
    state.login.logout()?;
    Ok(Json(serde_json::json!({ "status": "success" })).into_response())
}
