use async_trait::async_trait;
use common::{ProductId, ReservationId};
use sqlx::PgPool;

use crate::access;
use crate::engine::{ReservationEngine, ReserveRequest};
use crate::error::{ReservationError, Result};
use crate::model::{Product, ReservationStatus};

/// PostgreSQL-backed reservation engine.
///
/// Concurrency correctness is delegated entirely to row-level exclusive
/// locks acquired with `FOR UPDATE NOWAIT`: operations on disjoint rows run
/// fully in parallel, while the second of two racing operations on the same
/// product or reservation fails fast with [`ReservationError::Locked`]
/// instead of queueing.
#[derive(Clone)]
pub struct PostgresEngine {
    pool: PgPool,
}

impl PostgresEngine {
    /// Creates a new PostgreSQL reservation engine.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Provisions a new product with its initial stock. Used for seeding
    /// and operator tooling; the reservation flow never creates products.
    pub async fn add_product(&self, name: &str, price: i64, quantity: i64) -> Result<Product> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, price, quantity) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(price)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(Product {
            id: ProductId::new(id).ok_or_else(|| {
                ReservationError::Database(sqlx::Error::Decode("non-positive product id".into()))
            })?,
            name: name.to_string(),
            price,
            quantity,
        })
    }
}

/// Maps a database error from a locking fetch: a failed NOWAIT acquisition
/// becomes the retryable `Locked` variant, everything else stays a plain
/// database error.
fn lock_or_db(err: sqlx::Error, reservation_id: ReservationId) -> ReservationError {
    if access::is_lock_not_available(&err) {
        ReservationError::Locked { reservation_id }
    } else {
        ReservationError::Database(err)
    }
}

#[async_trait]
impl ReservationEngine for PostgresEngine {
    #[tracing::instrument(skip(self))]
    async fn make_or_update(&self, req: ReserveRequest) -> Result<ReservationId> {
        req.validate()?;
        let reservation_id = req.reservation_id;

        let mut tx = self.pool.begin().await?;

        let product = access::product_by_id(&mut tx, req.product_id, true)
            .await
            .map_err(|e| lock_or_db(e, reservation_id))?
            .ok_or(ReservationError::ProductNotFound { reservation_id })?;

        match access::reservation_by_id(&mut tx, reservation_id, true)
            .await
            .map_err(|e| lock_or_db(e, reservation_id))?
        {
            None => {
                tracing::info!(%reservation_id, "reservation not found, adding new one");
                access::insert_reservation(&mut tx, reservation_id).await?;
            }
            Some(r) if r.status != ReservationStatus::Pending => {
                tracing::info!(%reservation_id, status = %r.status, "reservation is not pending");
                return Err(ReservationError::ReservationClosed { reservation_id });
            }
            Some(_) => {}
        }

        let line = access::line_by_key(&mut tx, reservation_id, req.product_id, true)
            .await
            .map_err(|e| lock_or_db(e, reservation_id))?;

        // Signed stock delta: positive returns units to inventory, negative
        // consumes more.
        let delta = match &line {
            Some(line) if line.reservation_quantity == req.quantity => {
                tracing::warn!(
                    product_id = %req.product_id,
                    %reservation_id,
                    "product already reserved with the same quantity"
                );
                return Err(ReservationError::ProductAlreadyReserved { reservation_id });
            }
            Some(line) => line.reservation_quantity - req.quantity,
            None => {
                access::insert_line(
                    &mut tx,
                    reservation_id,
                    req.product_id,
                    req.quantity,
                    req.timestamp,
                )
                .await?;
                -req.quantity
            }
        };

        if product.quantity + delta < 0 {
            tracing::warn!(
                delta,
                available = product.quantity,
                "not enough products for reservation"
            );
            return Err(ReservationError::NotEnoughProducts { reservation_id });
        }

        sqlx::query("UPDATE products SET quantity = quantity + $1 WHERE id = $2")
            .bind(delta)
            .bind(req.product_id.get())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE reservation_lines SET reservation_quantity = $1, date = $2 \
             WHERE reservation_id = $3 AND product_id = $4",
        )
        .bind(req.quantity)
        .bind(req.timestamp)
        .bind(reservation_id.get())
        .bind(req.product_id.get())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("reservations_made_total").increment(1);
        tracing::info!(
            product_id = %req.product_id,
            delta,
            "reservation created/updated"
        );

        Ok(reservation_id)
    }

    #[tracing::instrument(skip(self))]
    async fn status(&self, reservation_id: ReservationId) -> Result<ReservationStatus> {
        let mut conn = self.pool.acquire().await?;

        let reservation = access::reservation_by_id(&mut conn, reservation_id, false)
            .await?
            .ok_or(ReservationError::ReservationNotFound { reservation_id })?;

        Ok(reservation.status)
    }

    #[tracing::instrument(skip(self))]
    async fn confirm(&self, reservation_id: ReservationId) -> Result<ReservationId> {
        let mut tx = self.pool.begin().await?;

        let reservation = access::reservation_by_id(&mut tx, reservation_id, true)
            .await
            .map_err(|e| lock_or_db(e, reservation_id))?
            .ok_or(ReservationError::ReservationNotFound { reservation_id })?;

        if reservation.status != ReservationStatus::Pending {
            return Err(ReservationError::ReservationClosed { reservation_id });
        }

        sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2")
            .bind(ReservationStatus::Confirmed.as_str())
            .bind(reservation_id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::counter!("reservations_confirmed_total").increment(1);
        tracing::info!(%reservation_id, "reservation confirmed");

        Ok(reservation_id)
    }
}
