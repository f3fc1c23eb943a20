use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ProductId, ReservationId};

use crate::error::{ReservationError, Result};
use crate::model::ReservationStatus;

/// Input for creating or updating a product hold within a reservation.
///
/// `quantity` is the *target* held quantity, not an increment. `timestamp`
/// is stored on the line verbatim and overwritten on every update; it plays
/// no role in business logic.
#[derive(Debug, Clone, Copy)]
pub struct ReserveRequest {
    pub reservation_id: ReservationId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
}

impl ReserveRequest {
    /// Checks the request bounds: positive quantity, timestamp strictly
    /// after the Unix epoch. The ids are positive by construction.
    pub fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(ReservationError::InvalidRequest(
                "quantity must be greater than 0".into(),
            ));
        }
        if self.timestamp <= DateTime::<Utc>::UNIX_EPOCH {
            return Err(ReservationError::InvalidRequest(
                "timestamp must be after 1970-01-01T00:00:00Z".into(),
            ));
        }
        Ok(())
    }
}

/// Core trait for reservation engine implementations.
///
/// Each operation is a single all-or-nothing unit of work; a failure leaves
/// no partial writes behind. Implementations must be thread-safe.
#[async_trait]
pub trait ReservationEngine: Send + Sync {
    /// Reserves `quantity` units of a product for a reservation, creating
    /// the reservation (pending) and the line as needed, or adjusting an
    /// existing line to the new target quantity.
    ///
    /// The product, reservation, and line rows are all read under
    /// exclusive non-blocking locks before any decision is made; contention
    /// anywhere fails the whole operation with [`ReservationError::Locked`].
    async fn make_or_update(&self, req: ReserveRequest) -> Result<ReservationId>;

    /// Returns the current status of a reservation. Never locks; tolerates
    /// last-committed reads.
    async fn status(&self, reservation_id: ReservationId) -> Result<ReservationStatus>;

    /// Transitions a pending reservation to confirmed. Line and product
    /// quantities are untouched; confirmation only finalizes the
    /// reservation's own state.
    async fn confirm(&self, reservation_id: ReservationId) -> Result<ReservationId>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn request(quantity: i64, timestamp: DateTime<Utc>) -> ReserveRequest {
        ReserveRequest {
            reservation_id: ReservationId::new(123).unwrap(),
            product_id: ProductId::new(456).unwrap(),
            quantity,
            timestamp,
        }
    }

    #[test]
    fn accepts_positive_quantity_and_modern_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(request(5, ts).validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            request(0, ts).validate(),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert!(request(-3, ts).validate().is_err());
    }

    #[test]
    fn rejects_timestamp_at_or_before_epoch() {
        assert!(request(5, DateTime::<Utc>::UNIX_EPOCH).validate().is_err());

        let before = Utc.with_ymd_and_hms(1969, 12, 31, 23, 0, 0).unwrap();
        assert!(request(5, before).validate().is_err());
    }
}
