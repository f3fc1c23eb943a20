//! Transactional reservation engine.
//!
//! This crate provides the core of the goods reservation service:
//! - the inventory data model (products, reservations, reservation lines)
//! - a locking accessor fetching rows with optional `FOR UPDATE NOWAIT`
//! - the `ReservationEngine` trait with PostgreSQL and in-memory
//!   implementations
//!
//! Every mutating operation runs as a single serializable transaction;
//! lock contention is surfaced as a distinct retryable error instead of
//! waiting on the row.

pub mod access;
pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;

pub use common::{ProductId, ReservationId};
pub use engine::{ReservationEngine, ReserveRequest};
pub use error::{ReservationError, Result};
pub use memory::InMemoryEngine;
pub use model::{Product, Reservation, ReservationLine, ReservationStatus};
pub use postgres::PostgresEngine;
