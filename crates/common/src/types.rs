use serde::{Deserialize, Serialize};

/// Unique identifier for a product.
///
/// Wraps an `i64` to provide type safety and prevent mixing up
/// product ids with reservation ids. Callers supply these ids;
/// the service never generates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    /// Creates a product id, rejecting non-positive values.
    pub fn new(value: i64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Returns the underlying integer.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation.
///
/// Reservation ids are chosen by the caller and double as the grouping
/// key for everything reserved under one reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(i64);

impl ReservationId {
    /// Creates a reservation id, rejecting non-positive values.
    pub fn new(value: i64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Returns the underlying integer.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_rejects_non_positive() {
        assert!(ProductId::new(0).is_none());
        assert!(ProductId::new(-5).is_none());
        assert_eq!(ProductId::new(456).unwrap().get(), 456);
    }

    #[test]
    fn reservation_id_rejects_non_positive() {
        assert!(ReservationId::new(0).is_none());
        assert!(ReservationId::new(-1).is_none());
        assert_eq!(ReservationId::new(123).unwrap().get(), 123);
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ReservationId::new(123).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "123");

        let back: ReservationId = serde_json::from_str("123").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_display_as_plain_integers() {
        assert_eq!(ProductId::new(7).unwrap().to_string(), "7");
        assert_eq!(ReservationId::new(9).unwrap().to_string(), "9");
    }
}
