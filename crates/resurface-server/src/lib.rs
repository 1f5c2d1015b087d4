//! resurface-server - REST API server for resurface.
//!
//! This crate exposes the review engine from `resurface-core` over HTTP.
//! Requests act for the user named in the `X-User-Id` header.
//!
//! # Example
//!
//! ```no_run
//! use resurface_server::{create_server, factory, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = factory::load_config()?;
//!     let state = AppState::new(factory::create_service(&config)?);
//!     let app = create_server(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use factory::create_service;
pub use middleware::CurrentUser;
pub use state::AppState;

use std::sync::Arc;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}

/// Create the server with API key authentication.
pub fn create_server_with_auth(state: AppState, api_key: impl Into<Arc<str>>) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn_with_state(
            api_key.into(),
            middleware::auth_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
