//! Integration tests for the API server.
//!
//! Driven end-to-end through the router with the in-memory engine, so they
//! exercise the same handler and error-mapping code paths as production
//! without a database.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use engine::{InMemoryEngine, ProductId};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

use api::routes::reservation::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Router plus the engine behind it, with one product seeded at 10 units.
async fn setup() -> (axum::Router, InMemoryEngine, ProductId) {
    let reservation_engine = InMemoryEngine::new();
    let product = reservation_engine.add_product("Product 1", 100, 10).await;

    let state = Arc::new(AppState {
        engine: reservation_engine.clone(),
    });
    let app = api::create_app(state, get_metrics_handle());
    (app, reservation_engine, product.id)
}

fn make_request(reservation_id: i64, product_id: i64, quantity: i64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/reservation/make")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "reservation_id": reservation_id,
                "product_id": product_id,
                "quantity": quantity,
                "timestamp": "2025-01-01T00:00:00Z",
            }))
            .unwrap(),
        ))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_make_reservation_success() {
    let (app, reservation_engine, product_id) = setup().await;

    let response = app
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Reservation created/updated");
    assert_eq!(json["reservation_id"], 123);

    assert_eq!(
        reservation_engine.product(product_id).await.unwrap().quantity,
        5
    );
}

#[tokio::test]
async fn test_make_reservation_product_not_found() {
    let (app, _, _) = setup().await;

    let response = app.oneshot(make_request(123, 999, 5)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Product not found");
    assert_eq!(json["reservation_id"], 123);
}

#[tokio::test]
async fn test_make_reservation_already_reserved() {
    let (app, _, product_id) = setup().await;

    let first = app
        .clone()
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["message"], "This product is already reserved");
    assert_eq!(json["reservation_id"], 123);
}

#[tokio::test]
async fn test_make_reservation_not_enough_products() {
    let (app, reservation_engine, product_id) = setup().await;

    let first = app
        .clone()
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let response = app
        .oneshot(make_request(123, product_id.get(), 30))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Not enough products available");

    assert_eq!(
        reservation_engine.product(product_id).await.unwrap().quantity,
        5
    );
}

#[tokio::test]
async fn test_update_reservation_adjusts_stock() {
    let (app, reservation_engine, product_id) = setup().await;

    app.clone()
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();
    let response = app
        .oneshot(make_request(123, product_id.get(), 7))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        reservation_engine.product(product_id).await.unwrap().quantity,
        3
    );
}

#[tokio::test]
async fn test_make_reservation_locked() {
    let (app, reservation_engine, product_id) = setup().await;

    let hold = reservation_engine.hold_lock().await;
    let response = app
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();
    drop(hold);

    assert_eq!(response.status(), StatusCode::LOCKED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Reservation is locked by another transaction");
    assert_eq!(json["reservation_id"], 123);
}

#[tokio::test]
async fn test_make_reservation_rejects_invalid_ids() {
    let (app, _, product_id) = setup().await;

    let response = app
        .clone()
        .oneshot(make_request(0, product_id.get(), 5))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.oneshot(make_request(123, -1, 5)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_make_reservation_rejects_invalid_quantity() {
    let (app, _, product_id) = setup().await;

    let response = app
        .oneshot(make_request(123, product_id.get(), 0))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn test_check_reservation_status() {
    let (app, _, product_id) = setup().await;

    app.clone()
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reservation/status/123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Reservation status: pending");
    assert_eq!(json["reservation_id"], 123);
}

#[tokio::test]
async fn test_check_status_of_unknown_reservation() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reservation/status/404")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Reservation not found");
    assert_eq!(json["reservation_id"], 404);
}

#[tokio::test]
async fn test_confirm_reservation_lifecycle() {
    let (app, _, product_id) = setup().await;

    app.clone()
        .oneshot(make_request(123, product_id.get(), 5))
        .await
        .unwrap();

    let confirm = |app: axum::Router| async move {
        app.oneshot(
            Request::builder()
                .method("PUT")
                .uri("/reservation/confirm/123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    };

    let response = confirm(app.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Reservation confirmed");

    // Status now reports confirmed
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/reservation/status/123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["message"], "Reservation status: confirmed");

    // Second confirm conflicts
    let response = confirm(app.clone()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Reservation is closed or confirmed");

    // Further makes on the closed reservation conflict too
    let response = app
        .oneshot(make_request(123, product_id.get(), 7))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_confirm_unknown_reservation() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/reservation/confirm/404")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Reservation not found");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
