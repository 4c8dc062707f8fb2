pub mod booking;
pub mod deadline;
pub mod flight;
pub mod money;
pub mod page;
pub mod payment;
pub mod repository;
pub mod seat;
pub mod user;

use std::time::Duration;

pub use deadline::bounded;
pub use booking::{Booking, BookingStatus, BookingView, NewBooking, NewPassenger, Passenger};
pub use flight::{Flight, FlightPatch, FlightRoute, NewFlight, NewRoute, RouteSearch};
pub use money::check_money_scale;
pub use page::{Page, PageRequest};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use repository::{Store, StoreError, StoreResult, StoreTx};
pub use seat::{NewSeat, NewSeatClass, Seat, SeatClass, SeatClassPatch, SeatPatch, SeatStatus};
pub use user::{Gender, NewUser, User, UserPatch, UserRole};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Seats unavailable: {}", .conflicting_seats.join(", "))]
    SeatUnavailable { conflicting_seats: Vec<String> },
    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(i64),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Turns a unique or foreign-key violation into `Conflict(message)`.
    /// Other store failures stay internal.
    pub fn conflict_on_constraint(err: StoreError, message: impl Into<String>) -> Self {
        match err {
            StoreError::UniqueViolation(_) | StoreError::ForeignKeyViolation(_) => {
                CoreError::Conflict(message.into())
            }
            other => other.into(),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::InternalError(err.to_string())
    }
}

/// Raised when a persisted enum column holds a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}
