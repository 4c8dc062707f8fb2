use async_trait::async_trait;

use crate::booking::{Booking, BookingStatus, NewBooking, NewPassenger, Passenger};
use crate::flight::{Flight, FlightPatch, FlightRoute, NewFlight, NewRoute, RouteSearch};
use crate::page::PageRequest;
use crate::payment::{NewPayment, Payment, PaymentStatus};
use crate::seat::{NewSeat, NewSeatClass, Seat, SeatClass, SeatClassPatch, SeatPatch};
use crate::user::{NewUser, User, UserPatch};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point to persistence. Every read and write happens inside a unit of
/// work obtained from [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// A single unit of work.
///
/// Writes become visible to other units of work only after [`StoreTx::commit`];
/// dropping the value rolls them back. The `lock_*` methods take row locks that
/// are held until the unit of work ends.
#[async_trait]
pub trait StoreTx: Send {
    // Users
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;
    async fn get_user(&mut self, user_id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&mut self, user_id: i64, patch: &UserPatch) -> StoreResult<Option<User>>;
    async fn list_users(&mut self, page: &PageRequest) -> StoreResult<Vec<User>>;
    async fn count_users(&mut self) -> StoreResult<i64>;

    // Flights
    async fn insert_flight(&mut self, flight: &NewFlight) -> StoreResult<Flight>;
    async fn get_flight(&mut self, flight_id: i64) -> StoreResult<Option<Flight>>;
    async fn lock_flight(&mut self, flight_id: i64) -> StoreResult<Option<Flight>>;
    async fn list_flights(&mut self, page: &PageRequest) -> StoreResult<Vec<Flight>>;
    async fn count_flights(&mut self) -> StoreResult<i64>;
    async fn update_flight(&mut self, flight_id: i64, patch: &FlightPatch) -> StoreResult<Option<Flight>>;
    /// Removes the flight together with its seats and routes.
    async fn delete_flight(&mut self, flight_id: i64) -> StoreResult<bool>;

    // Routes
    async fn insert_route(&mut self, route: &NewRoute) -> StoreResult<FlightRoute>;
    async fn get_route(&mut self, route_id: i64) -> StoreResult<Option<FlightRoute>>;
    async fn update_route(&mut self, route: &FlightRoute) -> StoreResult<Option<FlightRoute>>;
    async fn delete_route(&mut self, route_id: i64) -> StoreResult<bool>;
    async fn search_routes(&mut self, search: &RouteSearch, page: &PageRequest) -> StoreResult<Vec<FlightRoute>>;
    async fn count_routes(&mut self, search: &RouteSearch) -> StoreResult<i64>;

    // Seat classes
    async fn insert_seat_class(&mut self, class: &NewSeatClass) -> StoreResult<SeatClass>;
    async fn get_seat_class(&mut self, class_id: i64) -> StoreResult<Option<SeatClass>>;
    async fn list_seat_classes(&mut self) -> StoreResult<Vec<SeatClass>>;
    async fn update_seat_class(&mut self, class_id: i64, patch: &SeatClassPatch) -> StoreResult<Option<SeatClass>>;
    async fn delete_seat_class(&mut self, class_id: i64) -> StoreResult<bool>;

    // Seats
    async fn insert_seat(&mut self, seat: &NewSeat) -> StoreResult<Seat>;
    async fn get_seat(&mut self, seat_id: i64) -> StoreResult<Option<Seat>>;
    async fn lock_seat(&mut self, seat_id: i64) -> StoreResult<Option<Seat>>;
    async fn update_seat(&mut self, seat_id: i64, patch: &SeatPatch) -> StoreResult<Option<Seat>>;
    async fn delete_seat(&mut self, seat_id: i64) -> StoreResult<bool>;
    async fn count_seats(&mut self, flight_id: i64) -> StoreResult<i64>;
    async fn count_booked_seats(&mut self, flight_id: i64) -> StoreResult<i64>;
    /// Seat numbers currently AVAILABLE on the flight, ordered by seat number.
    async fn available_seat_numbers(&mut self, flight_id: i64) -> StoreResult<Vec<String>>;
    /// Locks the named seats of a flight. Unknown numbers are simply absent from the result.
    async fn lock_seats(&mut self, flight_id: i64, seat_numbers: &[String]) -> StoreResult<Vec<Seat>>;
    /// Locks every seat currently held by the booking.
    async fn lock_booking_seats(&mut self, booking_id: i64) -> StoreResult<Vec<Seat>>;
    /// Marks the seats BOOKED for `booking_id`, touching only rows that are still
    /// AVAILABLE. Returns the number of rows changed.
    async fn book_seats(&mut self, seat_ids: &[i64], booking_id: i64) -> StoreResult<u64>;
    /// Marks the seats AVAILABLE and clears their owner.
    async fn free_seats(&mut self, seat_ids: &[i64]) -> StoreResult<u64>;
    async fn booking_seat_numbers(&mut self, booking_id: i64) -> StoreResult<Vec<String>>;
    /// BOOKED seats whose owning booking is CANCELLED.
    async fn stale_booked_seats(&mut self) -> StoreResult<Vec<Seat>>;

    // Bookings
    async fn insert_booking(&mut self, booking: &NewBooking) -> StoreResult<Booking>;
    async fn get_booking(&mut self, booking_id: i64) -> StoreResult<Option<Booking>>;
    async fn lock_booking(&mut self, booking_id: i64) -> StoreResult<Option<Booking>>;
    async fn set_booking_status(&mut self, booking_id: i64, status: BookingStatus) -> StoreResult<Option<Booking>>;
    /// Newest first.
    async fn user_bookings(&mut self, user_id: i64) -> StoreResult<Vec<Booking>>;
    async fn count_flight_bookings(&mut self, flight_id: i64) -> StoreResult<i64>;
    /// Non-cancelled bookings that hold no seat.
    async fn bookings_without_seats(&mut self) -> StoreResult<Vec<Booking>>;

    // Passengers
    async fn insert_passenger(&mut self, booking_id: i64, passenger: &NewPassenger) -> StoreResult<Passenger>;
    async fn booking_passengers(&mut self, booking_id: i64) -> StoreResult<Vec<Passenger>>;
    /// Deletes the booking's passengers, restricted to `seat_numbers` when given.
    async fn delete_passengers(&mut self, booking_id: i64, seat_numbers: Option<&[String]>) -> StoreResult<u64>;

    // Payments
    async fn insert_payment(&mut self, payment: &NewPayment) -> StoreResult<Payment>;
    async fn get_payment(&mut self, payment_id: i64) -> StoreResult<Option<Payment>>;
    async fn set_payment_status(&mut self, payment_id: i64, status: PaymentStatus) -> StoreResult<Option<Payment>>;
    async fn delete_payment(&mut self, payment_id: i64) -> StoreResult<bool>;
    async fn booking_payments(&mut self, booking_id: i64) -> StoreResult<Vec<Payment>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
