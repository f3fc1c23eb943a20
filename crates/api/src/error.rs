//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::ReservationError;

/// API-level error type that maps to HTTP responses.
///
/// Every response body has the same shape as success payloads:
/// `{status: "error", message, reservation_id}`, so callers can always
/// correlate a failure with the reservation they were working on.
#[derive(Debug)]
pub enum ApiError {
    /// Request rejected before reaching the engine.
    Validation {
        message: String,
        reservation_id: i64,
    },
    /// The engine rejected or failed the operation.
    Engine {
        error: ReservationError,
        reservation_id: i64,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>, reservation_id: i64) -> Self {
        Self::Validation {
            message: message.into(),
            reservation_id,
        }
    }

    pub fn engine(error: ReservationError, reservation_id: i64) -> Self {
        Self::Engine {
            error,
            reservation_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, reservation_id) = match self {
            ApiError::Validation {
                message,
                reservation_id,
            } => (StatusCode::UNPROCESSABLE_ENTITY, message, reservation_id),
            ApiError::Engine {
                error,
                reservation_id,
            } => {
                let id = error
                    .reservation_id()
                    .map(|id| id.get())
                    .unwrap_or(reservation_id);
                let (status, message) = engine_error_to_response(error);
                (status, message, id)
            }
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message,
            "reservation_id": reservation_id,
        });
        (status, axum::Json(body)).into_response()
    }
}

fn engine_error_to_response(err: ReservationError) -> (StatusCode, String) {
    match err {
        ReservationError::ProductNotFound { .. } => {
            (StatusCode::NOT_FOUND, "Product not found".to_string())
        }
        ReservationError::ReservationNotFound { .. } => {
            (StatusCode::NOT_FOUND, "Reservation not found".to_string())
        }
        ReservationError::ProductAlreadyReserved { .. } => (
            StatusCode::CONFLICT,
            "This product is already reserved".to_string(),
        ),
        ReservationError::ReservationClosed { .. } => (
            StatusCode::CONFLICT,
            "Reservation is closed or confirmed".to_string(),
        ),
        ReservationError::NotEnoughProducts { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Not enough products available".to_string(),
        ),
        ReservationError::Locked { .. } => (
            StatusCode::LOCKED,
            "Reservation is locked by another transaction".to_string(),
        ),
        ReservationError::InvalidRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        ReservationError::Database(_) | ReservationError::Migration(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}
