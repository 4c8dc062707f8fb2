use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult, UnknownVariant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Booked => "BOOKED",
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SeatStatus::Available),
            "BOOKED" => Ok(SeatStatus::Booked),
            other => Err(UnknownVariant::new("seat status", other)),
        }
    }
}

/// A physical seat on a flight.
///
/// `status == Booked` exactly when `booking_id` is set; the store only ever
/// writes the two columns together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seat {
    pub seat_id: i64,
    pub flight_id: i64,
    pub seat_number: String,
    pub class_id: Option<i64>,
    pub status: SeatStatus,
    pub booking_id: Option<i64>,
}

impl Seat {
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    pub fn is_held_by(&self, booking_id: i64) -> bool {
        self.status == SeatStatus::Booked && self.booking_id == Some(booking_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewSeat {
    pub flight_id: i64,
    pub seat_number: String,
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SeatPatch {
    pub seat_number: Option<String>,
    pub class_id: Option<i64>,
}

impl SeatPatch {
    pub fn is_empty(&self) -> bool {
        self.seat_number.is_none() && self.class_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatClass {
    pub class_id: i64,
    pub class_name: String,
    pub price_multiplier: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewSeatClass {
    pub class_name: String,
    pub price_multiplier: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct SeatClassPatch {
    pub class_name: Option<String>,
    pub price_multiplier: Option<Decimal>,
}

impl SeatClassPatch {
    pub fn is_empty(&self) -> bool {
        self.class_name.is_none() && self.price_multiplier.is_none()
    }
}

/// Canonical form of a single seat number: trimmed and upper-cased.
pub fn normalize_seat_number(raw: &str) -> CoreResult<String> {
    let seat = raw.trim().to_ascii_uppercase();
    if seat.is_empty() {
        return Err(CoreError::InvalidArgument("seat number must not be blank".to_string()));
    }
    Ok(seat)
}

/// Normalizes a requested seat list into an ordered set, collapsing duplicates.
pub fn normalize_seat_numbers<I, S>(seats: I) -> CoreResult<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for raw in seats {
        set.insert(normalize_seat_number(raw.as_ref())?);
    }
    if set.is_empty() {
        return Err(CoreError::InvalidArgument(
            "at least one seat number is required".to_string(),
        ));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let set = normalize_seat_numbers(["1a", " 1A ", "2B"]).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["1A", "2B"]);
    }

    #[test]
    fn test_empty_request_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            normalize_seat_numbers(empty),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_blank_seat_rejected() {
        assert!(matches!(
            normalize_seat_numbers(["1A", "   "]),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
