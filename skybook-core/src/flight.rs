use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub flight_id: i64,
    pub airline: String,
    pub flight_number: String,
    pub total_seats: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFlight {
    pub airline: String,
    pub flight_number: String,
    pub total_seats: i32,
}

#[derive(Debug, Clone, Default)]
pub struct FlightPatch {
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub total_seats: Option<i32>,
}

impl FlightPatch {
    pub fn is_empty(&self) -> bool {
        self.airline.is_none() && self.flight_number.is_none() && self.total_seats.is_none()
    }

    pub fn apply(&self, flight: &mut Flight) {
        if let Some(airline) = &self.airline {
            flight.airline = airline.clone();
        }
        if let Some(number) = &self.flight_number {
            flight.flight_number = number.clone();
        }
        if let Some(total) = self.total_seats {
            flight.total_seats = total;
        }
    }
}

/// A priced leg flown by a flight. `total_price` is always `base_price + gst`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightRoute {
    pub route_id: i64,
    pub flight_id: i64,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub gst: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewRoute {
    pub flight_id: i64,
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub gst: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct RouteSearch {
    pub departure_city: String,
    pub arrival_city: String,
    pub date: NaiveDate,
}

impl RouteSearch {
    /// City comparison is case-insensitive; departure must fall on `date` (UTC).
    pub fn matches(&self, route: &FlightRoute) -> bool {
        route.departure_city.eq_ignore_ascii_case(&self.departure_city)
            && route.arrival_city.eq_ignore_ascii_case(&self.arrival_city)
            && route.departure_time.date_naive() == self.date
    }
}
