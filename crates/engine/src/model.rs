use chrono::{DateTime, Utc};
use common::{ProductId, ReservationId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reservation.
///
/// `Pending` is the only state that accepts line changes. `Confirmed` and
/// `Cancelled` are terminal. Nothing in this service sets `Cancelled`; the
/// state exists for future cancellation flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    /// Returns the lowercase text stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// A product with its currently available (unreserved) stock.
///
/// `quantity` is maintained incrementally by the engine applying signed
/// deltas at write time; it is never recomputed from the lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    pub quantity: i64,
}

/// A caller-identified grouping of product holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub status: ReservationStatus,
}

/// How much of one product is held by one reservation.
///
/// At most one line exists per `(reservation_id, product_id)` pair; the
/// database enforces this with a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationLine {
    pub id: i64,
    pub reservation_id: ReservationId,
    pub product_id: ProductId,
    pub reservation_quantity: i64,
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(status));
        }
    }

    #[test]
    fn status_rejects_unknown_text() {
        assert!("shipped".parse::<ReservationStatus>().is_err());
        assert!("PENDING".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn status_displays_as_stored_text() {
        assert_eq!(ReservationStatus::Confirmed.to_string(), "confirmed");
    }
}
