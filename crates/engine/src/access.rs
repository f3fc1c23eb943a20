//! Locking accessor: keyed row lookups with optional exclusive,
//! non-blocking locks.
//!
//! When `lock` is true the SELECT carries `FOR UPDATE NOWAIT`, so a
//! conflicting holder makes the statement fail immediately with SQLSTATE
//! `55P03` instead of queueing. Absent rows are `Ok(None)`, never an error.
//! All functions run against the caller's connection so they participate in
//! whatever transaction is open on it.

use chrono::{DateTime, Utc};
use common::{ProductId, ReservationId};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};

use crate::model::{Product, Reservation, ReservationLine, ReservationStatus};

/// PostgreSQL SQLSTATE for a failed NOWAIT lock acquisition.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Whether an error is a failed non-blocking lock acquisition.
pub fn is_lock_not_available(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE),
        _ => false,
    }
}

/// Fetches a product by id, exclusively locked when `lock` is set.
pub async fn product_by_id(
    conn: &mut PgConnection,
    product_id: ProductId,
    lock: bool,
) -> Result<Option<Product>, sqlx::Error> {
    let sql = if lock {
        "SELECT id, name, price, quantity FROM products WHERE id = $1 FOR UPDATE NOWAIT"
    } else {
        "SELECT id, name, price, quantity FROM products WHERE id = $1"
    };

    let row = sqlx::query(sql)
        .bind(product_id.get())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(row_to_product).transpose()
}

/// Fetches a reservation by id, exclusively locked when `lock` is set.
pub async fn reservation_by_id(
    conn: &mut PgConnection,
    reservation_id: ReservationId,
    lock: bool,
) -> Result<Option<Reservation>, sqlx::Error> {
    let sql = if lock {
        "SELECT id, status FROM reservations WHERE id = $1 FOR UPDATE NOWAIT"
    } else {
        "SELECT id, status FROM reservations WHERE id = $1"
    };

    let row = sqlx::query(sql)
        .bind(reservation_id.get())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(row_to_reservation).transpose()
}

/// Fetches the line for a `(reservation, product)` pair, exclusively locked
/// when `lock` is set.
pub async fn line_by_key(
    conn: &mut PgConnection,
    reservation_id: ReservationId,
    product_id: ProductId,
    lock: bool,
) -> Result<Option<ReservationLine>, sqlx::Error> {
    let sql = if lock {
        "SELECT id, reservation_id, product_id, reservation_quantity, date \
         FROM reservation_lines WHERE reservation_id = $1 AND product_id = $2 \
         FOR UPDATE NOWAIT"
    } else {
        "SELECT id, reservation_id, product_id, reservation_quantity, date \
         FROM reservation_lines WHERE reservation_id = $1 AND product_id = $2"
    };

    let row = sqlx::query(sql)
        .bind(reservation_id.get())
        .bind(product_id.get())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(row_to_line).transpose()
}

/// Inserts a new pending reservation inside the caller's transaction.
pub async fn insert_reservation(
    conn: &mut PgConnection,
    reservation_id: ReservationId,
) -> Result<Reservation, sqlx::Error> {
    sqlx::query("INSERT INTO reservations (id, status) VALUES ($1, $2)")
        .bind(reservation_id.get())
        .bind(ReservationStatus::Pending.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(Reservation {
        id: reservation_id,
        status: ReservationStatus::Pending,
    })
}

/// Inserts a new reservation line inside the caller's transaction.
pub async fn insert_line(
    conn: &mut PgConnection,
    reservation_id: ReservationId,
    product_id: ProductId,
    quantity: i64,
    date: DateTime<Utc>,
) -> Result<ReservationLine, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO reservation_lines (reservation_id, product_id, reservation_quantity, date) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(reservation_id.get())
    .bind(product_id.get())
    .bind(quantity)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(ReservationLine {
        id,
        reservation_id,
        product_id,
        reservation_quantity: quantity,
        date,
    })
}

fn row_to_product(row: PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: decode_product_id(row.try_get("id")?)?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        quantity: row.try_get("quantity")?,
    })
}

fn row_to_reservation(row: PgRow) -> Result<Reservation, sqlx::Error> {
    Ok(Reservation {
        id: decode_reservation_id(row.try_get("id")?)?,
        status: decode_status(row.try_get("status")?)?,
    })
}

fn row_to_line(row: PgRow) -> Result<ReservationLine, sqlx::Error> {
    Ok(ReservationLine {
        id: row.try_get("id")?,
        reservation_id: decode_reservation_id(row.try_get("reservation_id")?)?,
        product_id: decode_product_id(row.try_get("product_id")?)?,
        reservation_quantity: row.try_get("reservation_quantity")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

fn decode_product_id(raw: i64) -> Result<ProductId, sqlx::Error> {
    ProductId::new(raw).ok_or_else(|| sqlx::Error::Decode("non-positive product id".into()))
}

fn decode_reservation_id(raw: i64) -> Result<ReservationId, sqlx::Error> {
    ReservationId::new(raw).ok_or_else(|| sqlx::Error::Decode("non-positive reservation id".into()))
}

fn decode_status(raw: String) -> Result<ReservationStatus, sqlx::Error> {
    raw.parse()
        .map_err(|e: String| sqlx::Error::Decode(e.into()))
}
