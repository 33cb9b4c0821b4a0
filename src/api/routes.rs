//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/positions", get(positions_handler))
        // Tables
        .route("/tables", get(list_tables_handler).post(create_table_handler))
        .route("/tables/:id", get(get_table_handler))
        .route("/tables/:id/bets", post(place_bet_handler))
        .route("/tables/:id/spin", post(spin_handler))
        .route("/tables/:id/claim", post(claim_handler))
        .route("/tables/:id/fund", post(fund_handler))
        .route("/tables/:id/close", post(close_handler))
        // Accounts
        .route("/accounts/:address", get(account_handler))
        .route("/accounts/:address/airdrop", post(airdrop_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
