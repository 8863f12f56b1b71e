//! Service description endpoint.

use axum::{Json, Router, routing::get};
use bingo_generation::domain::commands::{MAX_ROUNDS, MAX_TICKETS};
use bingo_generation::domain::grid::{COLUMN_RANGES, FREE_MARKER, GRID_SIZE};
use serde::Serialize;

use crate::state::AppState;

/// Static description of the grid layout.
#[derive(Debug, Serialize)]
pub struct BingoConfig {
    /// Highest ball number.
    pub balls: u8,
    /// Rows per grid.
    pub rows: usize,
    /// Columns per grid.
    pub cols: usize,
    /// Inclusive value range per column.
    pub column_ranges: Vec<[u8; 2]>,
    /// Literal used for the centre cell.
    pub free_square: &'static str,
    /// Maximum rounds per ticket.
    pub max_rounds: u32,
    /// Maximum tickets per request.
    pub max_tickets: u32,
}

/// Service information response.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Service name.
    pub name: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Supported operations.
    pub capabilities: [&'static str; 3],
    /// Grid layout.
    pub bingo_config: BingoConfig,
}

/// GET /info
async fn service_info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Bingo Generator Service",
        version: env!("CARGO_PKG_VERSION"),
        capabilities: ["generate_tickets", "verify_tickets", "lookup_subcards"],
        bingo_config: BingoConfig {
            balls: COLUMN_RANGES[GRID_SIZE - 1].1,
            rows: GRID_SIZE,
            cols: GRID_SIZE,
            column_ranges: COLUMN_RANGES.iter().map(|&(lo, hi)| [lo, hi]).collect(),
            free_square: FREE_MARKER,
            max_rounds: MAX_ROUNDS,
            max_tickets: MAX_TICKETS,
        },
    })
}

/// Returns the info router.
pub fn router() -> Router<AppState> {
    Router::new().route("/info", get(service_info))
}
