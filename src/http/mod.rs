//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the relay endpoints
//! - Request handlers for channel lists, manifests and login
//! - Error to status code mapping
//! - CORS middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
