//! HTTP API server for the goods reservation service.
//!
//! Translates inbound requests into reservation engine calls and engine
//! results into `{status, message, reservation_id}` responses, with
//! structured logging (tracing) and Prometheus metrics. The router is
//! generic over the engine so tests can drive it with the in-memory
//! implementation.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use engine::ReservationEngine;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::reservation::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<E: ReservationEngine + Clone + 'static>(
    state: Arc<AppState<E>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/reservation/make", post(routes::reservation::make::<E>))
        .route(
            "/reservation/status/{reservation_id}",
            get(routes::reservation::status::<E>),
        )
        .route(
            "/reservation/confirm/{reservation_id}",
            put(routes::reservation::confirm::<E>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
