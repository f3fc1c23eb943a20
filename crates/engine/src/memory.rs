use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, ReservationId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::engine::{ReservationEngine, ReserveRequest};
use crate::error::{ReservationError, Result};
use crate::model::{Product, Reservation, ReservationLine, ReservationStatus};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    reservations: HashMap<ReservationId, Reservation>,
    lines: HashMap<(ReservationId, ProductId), ReservationLine>,
    next_product_id: i64,
    next_line_id: i64,
}

/// Guard returned by [`InMemoryEngine::hold_lock`]. While it lives, every
/// mutating operation on the engine fails with `Locked`.
pub struct ExclusiveHold {
    _guard: OwnedMutexGuard<State>,
}

/// In-memory reservation engine for tests and local runs.
///
/// Provides the same interface as the PostgreSQL implementation. Mutating
/// operations acquire the store with `try_lock`, so contention produces the
/// same retryable `Locked` failure as a failed `FOR UPDATE NOWAIT` — at
/// whole-store rather than row granularity. Status reads wait instead of
/// failing, mirroring the non-locking read path.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    state: Arc<Mutex<State>>,
}

impl InMemoryEngine {
    /// Creates a new empty in-memory engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provisions a product with its initial stock.
    pub async fn add_product(&self, name: &str, price: i64, quantity: i64) -> Product {
        let mut state = self.state.lock().await;
        state.next_product_id += 1;
        let id = ProductId::new(state.next_product_id).expect("counter starts at 1");
        let product = Product {
            id,
            name: name.to_string(),
            price,
            quantity,
        };
        state.products.insert(id, product.clone());
        product
    }

    /// Returns a product snapshot, if present.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    /// Returns the line for a `(reservation, product)` pair, if present.
    pub async fn line(
        &self,
        reservation_id: ReservationId,
        product_id: ProductId,
    ) -> Option<ReservationLine> {
        self.state
            .lock()
            .await
            .lines
            .get(&(reservation_id, product_id))
            .cloned()
    }

    /// Holds the store exclusively until the guard drops. Lets tests drive
    /// the contention path deterministically.
    pub async fn hold_lock(&self) -> ExclusiveHold {
        ExclusiveHold {
            _guard: self.state.clone().lock_owned().await,
        }
    }

    /// Clears all state.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = State::default();
    }
}

#[async_trait]
impl ReservationEngine for InMemoryEngine {
    async fn make_or_update(&self, req: ReserveRequest) -> Result<ReservationId> {
        req.validate()?;
        let reservation_id = req.reservation_id;

        let mut state = self
            .state
            .try_lock()
            .map_err(|_| ReservationError::Locked { reservation_id })?;

        // Decide everything before touching state so a late failure leaves
        // no partial writes, matching the transactional implementation.
        let product_quantity = state
            .products
            .get(&req.product_id)
            .map(|p| p.quantity)
            .ok_or(ReservationError::ProductNotFound { reservation_id })?;

        let create_reservation = match state.reservations.get(&reservation_id) {
            None => true,
            Some(r) if r.status != ReservationStatus::Pending => {
                return Err(ReservationError::ReservationClosed { reservation_id });
            }
            Some(_) => false,
        };

        let line_key = (reservation_id, req.product_id);
        let delta = match state.lines.get(&line_key) {
            Some(line) if line.reservation_quantity == req.quantity => {
                return Err(ReservationError::ProductAlreadyReserved { reservation_id });
            }
            Some(line) => line.reservation_quantity - req.quantity,
            None => -req.quantity,
        };

        if product_quantity + delta < 0 {
            return Err(ReservationError::NotEnoughProducts { reservation_id });
        }

        if create_reservation {
            state.reservations.insert(
                reservation_id,
                Reservation {
                    id: reservation_id,
                    status: ReservationStatus::Pending,
                },
            );
        }

        if let Some(product) = state.products.get_mut(&req.product_id) {
            product.quantity += delta;
        }

        state.next_line_id += 1;
        let line_id = state.next_line_id;
        state
            .lines
            .entry(line_key)
            .and_modify(|line| {
                line.reservation_quantity = req.quantity;
                line.date = req.timestamp;
            })
            .or_insert(ReservationLine {
                id: line_id,
                reservation_id,
                product_id: req.product_id,
                reservation_quantity: req.quantity,
                date: req.timestamp,
            });

        Ok(reservation_id)
    }

    async fn status(&self, reservation_id: ReservationId) -> Result<ReservationStatus> {
        let state = self.state.lock().await;
        state
            .reservations
            .get(&reservation_id)
            .map(|r| r.status)
            .ok_or(ReservationError::ReservationNotFound { reservation_id })
    }

    async fn confirm(&self, reservation_id: ReservationId) -> Result<ReservationId> {
        let mut state = self
            .state
            .try_lock()
            .map_err(|_| ReservationError::Locked { reservation_id })?;

        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or(ReservationError::ReservationNotFound { reservation_id })?;

        if reservation.status != ReservationStatus::Pending {
            return Err(ReservationError::ReservationClosed { reservation_id });
        }

        reservation.status = ReservationStatus::Confirmed;
        Ok(reservation_id)
    }
}
