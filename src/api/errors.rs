//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.
//! Table errors keep their machine-readable code in the body.

use crate::errors::RouletteError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (INVALID_POSITION, ALREADY_CLAIMED, NOT_FOUND, ...)
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, request_id: String, message: String) -> Self {
        Self {
            status,
            code: code.to_string(),
            message,
            request_id,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", request_id, message)
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", request_id, message)
    }

    pub fn forbidden(request_id: String, message: String) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", request_id, message)
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", request_id, message)
    }

    /// Map a table error onto a status code, keeping its kind as the code
    pub fn from_roulette(request_id: String, err: &RouletteError) -> Self {
        Self::new(status_for(err), err.code(), request_id, err.to_string())
    }
}

fn status_for(err: &RouletteError) -> StatusCode {
    use RouletteError::*;

    match err {
        InvalidIdentifier(_) | InvalidPosition(_) | InvalidAmount(_) => StatusCode::BAD_REQUEST,
        InvalidSignature(_) | StaleNonce { .. } => StatusCode::UNAUTHORIZED,
        InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        Unauthorized(_) | ReservedAddress(_) => StatusCode::FORBIDDEN,
        TableNotFound(_) | NoSuchBet(_) => StatusCode::NOT_FOUND,
        AlreadyExists(_)
        | BettingClosed(_)
        | TableFull { .. }
        | DuplicateBet(_)
        | NoBetsPlaced(_)
        | AlreadySpun(_)
        | ResultNotReady(_)
        | AlreadyClaimed(_)
        | InsufficientPool { .. }
        | TableClosed(_)
        | UnsettledBets { .. } => StatusCode::CONFLICT,
        ArithmeticOverflow(_) | Entropy(_) | Storage(_) | Configuration(_) | Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: {}", self.request_id, self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        });

        (self.status, body).into_response()
    }
}
