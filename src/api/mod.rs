//! Roulette HTTP API
//!
//! JSON transport for the table processor: signed mutations, table reads,
//! account balances and Prometheus metrics.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{build_app, init_tracing, ApiServer};
