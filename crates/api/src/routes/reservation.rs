//! Reservation endpoints: make/update, status check, and confirmation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{ProductId, ReservationId};
use engine::{ReservationEngine, ReserveRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<E: ReservationEngine> {
    pub engine: E,
}

// -- Request types --

#[derive(Deserialize)]
pub struct MakeReservationRequest {
    pub reservation_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReservationResponse {
    pub status: &'static str,
    pub message: String,
    pub reservation_id: i64,
}

impl ReservationResponse {
    fn success(message: impl Into<String>, reservation_id: ReservationId) -> Self {
        Self {
            status: "success",
            message: message.into(),
            reservation_id: reservation_id.get(),
        }
    }
}

// -- Handlers --

/// POST /reservation/make — creates a new reservation or updates an
/// existing one for a given product and target quantity.
#[tracing::instrument(skip(state, req))]
pub async fn make<E: ReservationEngine>(
    State(state): State<Arc<AppState<E>>>,
    Json(req): Json<MakeReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation_id = ReservationId::new(req.reservation_id).ok_or_else(|| {
        ApiError::validation(
            "reservation_id must be greater than 0",
            req.reservation_id,
        )
    })?;
    let product_id = ProductId::new(req.product_id)
        .ok_or_else(|| ApiError::validation("product_id must be greater than 0", req.reservation_id))?;

    let reservation_id = state
        .engine
        .make_or_update(ReserveRequest {
            reservation_id,
            product_id,
            quantity: req.quantity,
            timestamp: req.timestamp,
        })
        .await
        .map_err(|e| ApiError::engine(e, req.reservation_id))?;

    Ok(Json(ReservationResponse::success(
        "Reservation created/updated",
        reservation_id,
    )))
}

/// GET /reservation/status/:reservation_id — retrieves the current status
/// of a reservation.
#[tracing::instrument(skip(state))]
pub async fn status<E: ReservationEngine>(
    State(state): State<Arc<AppState<E>>>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let id = parse_reservation_id(reservation_id)?;

    let status = state
        .engine
        .status(id)
        .await
        .map_err(|e| ApiError::engine(e, reservation_id))?;

    Ok(Json(ReservationResponse::success(
        format!("Reservation status: {status}"),
        id,
    )))
}

/// PUT /reservation/confirm/:reservation_id — transitions a pending
/// reservation to confirmed.
#[tracing::instrument(skip(state))]
pub async fn confirm<E: ReservationEngine>(
    State(state): State<Arc<AppState<E>>>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let id = parse_reservation_id(reservation_id)?;

    let id = state
        .engine
        .confirm(id)
        .await
        .map_err(|e| ApiError::engine(e, reservation_id))?;

    Ok(Json(ReservationResponse::success(
        "Reservation confirmed",
        id,
    )))
}

fn parse_reservation_id(raw: i64) -> Result<ReservationId, ApiError> {
    ReservationId::new(raw)
        .ok_or_else(|| ApiError::validation("reservation_id must be greater than 0", raw))
}
