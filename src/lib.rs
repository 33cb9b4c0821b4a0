//! Roulette - single-table betting engine
//!
//! Bets are escrowed by a table, one spin fixes the winning pocket, and each
//! bettor settles independently against it. The HTTP server in `api` is a
//! thin transport over `games::TableProcessor`.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod factory;
pub mod games;
pub mod metrics;
pub mod storage;

pub use auth::{sign_request, RequestAuthenticator, SignedEnvelope};
pub use config::{ConfigBuilder, ConfigLoader, RouletteConfig};
pub use errors::{RouletteError, RouletteResult};
pub use factory::{RouletteFactory, RouletteRuntime};
pub use games::{Address, Position, TableProcessor};
