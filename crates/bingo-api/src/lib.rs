//! Bingo ticket generator — HTTP API.
//!
//! Thin transport over the generation context: request parsing, API key
//! checks and status mapping. All generation logic lives in
//! `bingo-generation`.

use axum::Router;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

/// Builds the full router. `main.rs` adds tracing and CORS layers on top.
pub fn app(state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::info::router())
        .nest("/generator", routes::generator::router())
        .with_state(state)
}
