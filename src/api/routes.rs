//! Route Definitions

use super::{handlers::*, websocket::websocket_handler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Live round
        .route("/round", get(round_handler))
        .route("/rounds/:round_id", get(round_report_handler))
        // Commands
        .route("/bets", post(place_bet_handler))
        .route("/bets/:bet_id/cashout", post(cash_out_handler))
        // Fairness
        .route("/fairness/public-key", get(public_key_handler))
        .route("/fairness/verify", post(verify_handler))
        .route("/ws", get(websocket_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
