use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use skybook_booking::{BookingChange, BookingRequest, CancelledBooking, PartialCancellation};
use skybook_core::{BookingView, Gender, NewPassenger};

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::middleware::auth::ensure_owner_or_admin;
use crate::middleware::{AuthUser, Identity};
use crate::response::ApiResponse;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PassengerRequest {
    #[validate(length(min = 1, max = 10, message = "seat_number must be 1-10 characters"))]
    pub seat_number: String,
    #[validate(length(min = 2, max = 50, message = "passenger_name must be 2-50 characters"))]
    pub passenger_name: String,
    #[validate(range(min = 1, max = 120, message = "age must be between 1 and 120"))]
    pub age: i32,
    pub gender: Gender,
    #[validate(length(min = 2, max = 50, message = "relation must be 2-50 characters"))]
    pub relation: Option<String>,
}

impl From<PassengerRequest> for NewPassenger {
    fn from(p: PassengerRequest) -> Self {
        NewPassenger {
            seat_number: p.seat_number,
            passenger_name: p.passenger_name,
            age: p.age,
            gender: p.gender,
            relation: p.relation,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    /// Defaults to the caller. Booking for someone else needs admin rights.
    pub user_id: Option<i64>,
    pub flight_id: i64,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_numbers: Vec<String>,
    pub total_price: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub passengers: Vec<PassengerRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelSeatsRequest {
    pub booking_id: i64,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_numbers: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ModifyBookingRequest {
    pub booking_id: i64,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_numbers: Option<Vec<String>>,
    #[validate(nested)]
    pub passengers: Option<Vec<PassengerRequest>>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/{id}", get(get_booking))
        .route("/user/{user_id}", get(user_bookings))
        .route("/cancel/{id}", put(cancel_booking))
        .route("/cancel-seats", put(cancel_seats))
        .route("/modify", put(modify_booking))
}

/// Loads a booking and checks the caller may act on it.
pub(crate) async fn ensure_booking_access(
    state: &AppState,
    identity: &Identity,
    booking_id: i64,
) -> Result<BookingView, AppError> {
    let view = state.ledger.get_booking(booking_id).await?;
    ensure_owner_or_admin(state, identity, view.booking.user_id).await?;
    Ok(view)
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_booking(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<ApiResponse<BookingView>, AppError> {
    let user_id = req.user_id.unwrap_or(identity.user_id);
    ensure_owner_or_admin(&state, &identity, user_id).await?;

    let request = BookingRequest {
        user_id,
        flight_id: req.flight_id,
        seat_numbers: req.seat_numbers,
        total_price: req.total_price,
        passengers: req.passengers.into_iter().map(NewPassenger::from).collect(),
    };
    let view = state.ledger.create_booking(request).await?;
    Ok(ApiResponse::created("Booking created successfully", view))
}

async fn get_booking(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(booking_id): Path<i64>,
) -> Result<ApiResponse<BookingView>, AppError> {
    let view = ensure_booking_access(&state, &identity, booking_id).await?;
    Ok(ApiResponse::ok("Booking fetched", view))
}

async fn user_bookings(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<Vec<BookingView>>, AppError> {
    ensure_owner_or_admin(&state, &identity, user_id).await?;
    let bookings = state.ledger.user_bookings(user_id).await?;
    Ok(ApiResponse::ok("Bookings fetched", bookings))
}

async fn cancel_booking(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(booking_id): Path<i64>,
) -> Result<ApiResponse<CancelledBooking>, AppError> {
    ensure_booking_access(&state, &identity, booking_id).await?;
    let cancelled = state.ledger.cancel_booking(booking_id).await?;
    Ok(ApiResponse::ok("Booking cancelled successfully", cancelled))
}

async fn cancel_seats(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<CancelSeatsRequest>,
) -> Result<ApiResponse<PartialCancellation>, AppError> {
    ensure_booking_access(&state, &identity, req.booking_id).await?;
    let result = state.ledger.cancel_specific_seats(req.booking_id, &req.seat_numbers).await?;
    Ok(ApiResponse::ok("Seats cancelled successfully", result))
}

async fn modify_booking(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<ModifyBookingRequest>,
) -> Result<ApiResponse<BookingView>, AppError> {
    ensure_booking_access(&state, &identity, req.booking_id).await?;
    let change = BookingChange {
        seat_numbers: req.seat_numbers,
        passengers: req
            .passengers
            .map(|list| list.into_iter().map(NewPassenger::from).collect()),
    };
    let view = state.ledger.modify_booking(req.booking_id, change).await?;
    Ok(ApiResponse::ok("Booking modified successfully", view))
}
