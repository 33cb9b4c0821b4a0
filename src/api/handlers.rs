//! Request Handlers
//!
//! Thin adapters from HTTP to the table processor. Mutations run on the
//! blocking pool since they hold a table lock across ledger and store writes.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::auth::{RequestAuthenticator, SignedEnvelope};
use crate::errors::RouletteError;
use crate::games::ledger::{FundsLedger, InMemoryLedger};
use crate::games::positions::CATALOG;
use crate::games::processor::TableProcessor;
use crate::games::types::{Address, TableAction, TableRequest};
use crate::metrics::TableMetrics;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub processor: Arc<TableProcessor>,
    pub ledger: Arc<InMemoryLedger>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub metrics: Arc<TableMetrics>,
    pub vrf_public_key: Option<String>,
    pub enable_metrics: bool,
    pub allow_airdrop: bool,
    pub version: String,
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
        entropy: state.processor.entropy_source().to_string(),
        vrf_public_key: state.vrf_public_key.clone(),
    })
}

/// GET /positions
pub async fn positions_handler() -> Json<Vec<PositionInfo>> {
    Json(CATALOG.iter().map(PositionInfo::from).collect())
}

/// GET /tables
pub async fn list_tables_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TablesResponse>, ApiError> {
    let tables = state
        .processor
        .list_tables()
        .map_err(|e| ApiError::from_roulette(request_id.0.clone(), &e))?;

    Ok(Json(TablesResponse {
        total: tables.len(),
        tables: tables.iter().map(TableView::from).collect(),
    }))
}

/// GET /tables/:id
pub async fn get_table_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
) -> Result<Json<TableView>, ApiError> {
    let table = state
        .processor
        .get_table(&table_id)
        .map_err(|e| ApiError::from_roulette(request_id.0.clone(), &e))?;

    Ok(Json(TableView::from(&table)))
}

/// POST /tables
pub async fn create_table_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTableRequest>,
) -> Result<(StatusCode, Json<ActionResponse>), ApiError> {
    let response = execute(state, request_id, body.table_id, TableAction::Create, body.auth).await?;
    Ok((StatusCode::CREATED, response))
}

/// POST /tables/:id/bets
pub async fn place_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(body): Json<PlaceBetRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let action = TableAction::Bet {
        position: body.position,
        amount: body.amount,
    };
    execute(state, request_id, table_id, action, body.auth).await
}

/// POST /tables/:id/spin
pub async fn spin_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(auth): Json<SignedEnvelope>,
) -> Result<Json<ActionResponse>, ApiError> {
    execute(state, request_id, table_id, TableAction::Spin, auth).await
}

/// POST /tables/:id/claim
pub async fn claim_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(auth): Json<SignedEnvelope>,
) -> Result<Json<ActionResponse>, ApiError> {
    execute(state, request_id, table_id, TableAction::ClaimPrize, auth).await
}

/// POST /tables/:id/fund
pub async fn fund_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(body): Json<FundTableRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let action = TableAction::Fund { amount: body.amount };
    execute(state, request_id, table_id, action, body.auth).await
}

/// POST /tables/:id/close
pub async fn close_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Json(auth): Json<SignedEnvelope>,
) -> Result<Json<ActionResponse>, ApiError> {
    execute(state, request_id, table_id, TableAction::Close, auth).await
}

/// GET /accounts/:address
pub async fn account_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Json<AccountResponse> {
    Json(account_view(&state, address))
}

/// POST /accounts/:address/airdrop
pub async fn airdrop_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(body): Json<AirdropRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if !state.allow_airdrop {
        return Err(ApiError::forbidden(request_id.0, "Airdrop is disabled".to_string()));
    }
    if body.amount == 0 {
        return Err(ApiError::bad_request(request_id.0, "Amount must be greater than zero".to_string()));
    }

    state
        .ledger
        .credit(&Address::new(address.clone()), body.amount)
        .map_err(|e| ApiError::from_roulette(request_id.0.clone(), &e))?;
    tracing::info!(account = %address, amount = body.amount, "Airdrop credited");

    Ok(Json(account_view(&state, address)))
}

/// GET /metrics
pub async fn metrics_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.enable_metrics {
        return Err(ApiError::not_found(request_id.0, "Metrics are disabled".to_string()));
    }

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    ))
}

fn account_view(state: &AppState, address: String) -> AccountResponse {
    let account = Address::new(address);
    AccountResponse {
        balance: state.ledger.balance(&account),
        next_nonce: state.authenticator.next_nonce(account.as_str()),
        address: account.0,
    }
}

/// Authenticate and run one table action, returning the receipt and the
/// table state it committed
async fn execute(
    state: Arc<AppState>,
    request_id: RequestId,
    table_id: String,
    action: TableAction,
    auth: SignedEnvelope,
) -> Result<Json<ActionResponse>, ApiError> {
    let RequestId(request_id) = request_id;

    let outcome = tokio::task::spawn_blocking(move || {
        let caller = state
            .authenticator
            .authenticate(&table_id, &action, &auth)
            .map_err(|e| {
                state.metrics.record_rejection(e.code());
                tracing::warn!(table = %table_id, signer = %auth.signer, code = e.code(), "Authentication failed: {}", e);
                e
            })?;

        let receipt = state.processor.execute(TableRequest {
            table_id: table_id.clone(),
            caller,
            action,
        })?;
        let table = state.processor.get_table(&table_id)?;
        Ok::<_, RouletteError>((receipt, table))
    })
    .await
    .map_err(|e| ApiError::internal_error(request_id.clone(), format!("Worker task failed: {}", e)))?;

    let (receipt, table) = outcome.map_err(|e| ApiError::from_roulette(request_id.clone(), &e))?;

    Ok(Json(ActionResponse {
        request_id,
        receipt,
        table: TableView::from(&table),
    }))
}
