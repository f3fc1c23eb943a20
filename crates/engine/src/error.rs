use common::ReservationId;
use thiserror::Error;

/// Errors that can occur during reservation operations.
///
/// Every variant tied to a request carries the reservation id for caller
/// correlation. Only `Locked` is transient; all other failures are semantic
/// rejections that will repeat until the caller changes the input.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The requested product does not exist.
    #[error("product not found (reservation {reservation_id})")]
    ProductNotFound { reservation_id: ReservationId },

    /// The requested reservation does not exist.
    #[error("reservation {reservation_id} not found")]
    ReservationNotFound { reservation_id: ReservationId },

    /// The reservation is no longer pending; no further changes allowed.
    #[error("reservation {reservation_id} is closed or confirmed")]
    ReservationClosed { reservation_id: ReservationId },

    /// The product is already held by this reservation with the same
    /// quantity. No-op updates are rejected so idempotent re-commits are
    /// not mistaken for real changes.
    #[error("product is already reserved with the same quantity (reservation {reservation_id})")]
    ProductAlreadyReserved { reservation_id: ReservationId },

    /// The requested quantity would drive available stock negative.
    #[error("not enough products available (reservation {reservation_id})")]
    NotEnoughProducts { reservation_id: ReservationId },

    /// A conflicting transaction holds a row lock. Safe to retry unchanged.
    #[error("reservation {reservation_id} is locked by another transaction")]
    Locked { reservation_id: ReservationId },

    /// The request failed input validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl ReservationError {
    /// Whether the caller may retry the same input later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// The reservation the failure relates to, when known.
    pub fn reservation_id(&self) -> Option<ReservationId> {
        match self {
            Self::ProductNotFound { reservation_id }
            | Self::ReservationNotFound { reservation_id }
            | Self::ReservationClosed { reservation_id }
            | Self::ProductAlreadyReserved { reservation_id }
            | Self::NotEnoughProducts { reservation_id }
            | Self::Locked { reservation_id } => Some(*reservation_id),
            Self::InvalidRequest(_) | Self::Database(_) | Self::Migration(_) => None,
        }
    }
}

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_locked_is_retryable() {
        let id = ReservationId::new(123).unwrap();

        assert!(ReservationError::Locked { reservation_id: id }.is_retryable());
        assert!(!ReservationError::NotEnoughProducts { reservation_id: id }.is_retryable());
        assert!(!ReservationError::ReservationClosed { reservation_id: id }.is_retryable());
        assert!(!ReservationError::InvalidRequest("bad".into()).is_retryable());
    }

    #[test]
    fn reservation_id_is_carried_for_correlation() {
        let id = ReservationId::new(7).unwrap();
        let err = ReservationError::ProductNotFound { reservation_id: id };
        assert_eq!(err.reservation_id(), Some(id));

        assert_eq!(
            ReservationError::InvalidRequest("bad".into()).reservation_id(),
            None
        );
    }
}
