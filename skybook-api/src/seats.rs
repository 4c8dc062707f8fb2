use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use skybook_booking::{ReleasedSeats, ReservedSeats};
use skybook_core::{NewSeat, NewSeatClass, Seat, SeatClass, SeatClassPatch, SeatPatch};

use crate::bookings::ensure_booking_access;
use crate::error::AppError;
use crate::extract::{positive_amount, ValidatedJson};
use crate::middleware::{AdminUser, AuthUser};
use crate::response::ApiResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct BookSeatsRequest {
    pub flight_id: i64,
    pub booking_id: i64,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_numbers: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReleaseSeatsRequest {
    pub booking_id: i64,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_numbers: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddSeatRequest {
    pub flight_id: i64,
    #[validate(length(min = 1, max = 10, message = "seat_number must be 1-10 characters"))]
    pub seat_number: String,
    pub class_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSeatRequest {
    #[validate(length(min = 1, max = 10, message = "seat_number must be 1-10 characters"))]
    pub seat_number: Option<String>,
    pub class_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SeatClassRequest {
    #[validate(length(min = 2, max = 50, message = "class_name must be 2-50 characters"))]
    pub class_name: String,
    #[validate(custom(function = "positive_amount"))]
    pub price_multiplier: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSeatClassRequest {
    #[validate(length(min = 2, max = 50, message = "class_name must be 2-50 characters"))]
    pub class_name: Option<String>,
    #[validate(custom(function = "positive_amount"))]
    pub price_multiplier: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct AvailableSeats {
    pub flight_id: i64,
    pub available_seats: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/available/{flight_id}", get(available_seats))
        .route("/book", post(book_seats))
        .route("/cancel", put(release_seats))
        .route("/add", post(add_seat))
        .route("/update/{seat_id}", put(update_seat))
        .route("/{seat_id}", delete(delete_seat))
        .route("/classes", get(list_classes).post(create_class))
        .route("/classes/{id}", get(get_class).put(update_class).delete(delete_class))
}

// ============================================================================
// Reservation
// ============================================================================

async fn available_seats(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Path(flight_id): Path<i64>,
) -> Result<ApiResponse<AvailableSeats>, AppError> {
    let available_seats = state.inventory.available_seats(flight_id).await?;
    Ok(ApiResponse::ok("Available seats fetched", AvailableSeats { flight_id, available_seats }))
}

async fn book_seats(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<BookSeatsRequest>,
) -> Result<ApiResponse<ReservedSeats>, AppError> {
    ensure_booking_access(&state, &identity, req.booking_id).await?;
    let reserved = state.inventory.reserve(req.flight_id, &req.seat_numbers, req.booking_id).await?;
    Ok(ApiResponse::ok("Seats booked successfully", reserved))
}

async fn release_seats(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<ReleaseSeatsRequest>,
) -> Result<ApiResponse<ReleasedSeats>, AppError> {
    ensure_booking_access(&state, &identity, req.booking_id).await?;
    let released = state.inventory.release(req.booking_id, &req.seat_numbers).await?;
    let message = format!("{} seat(s) released", released.count());
    Ok(ApiResponse::ok(message, released))
}

// ============================================================================
// Seat administration
// ============================================================================

async fn add_seat(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<AddSeatRequest>,
) -> Result<ApiResponse<Seat>, AppError> {
    let seat = state
        .inventory
        .add_seat(NewSeat { flight_id: req.flight_id, seat_number: req.seat_number, class_id: req.class_id })
        .await?;
    Ok(ApiResponse::created("Seat added successfully", seat))
}

async fn update_seat(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(seat_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateSeatRequest>,
) -> Result<ApiResponse<Seat>, AppError> {
    let patch = SeatPatch { seat_number: req.seat_number, class_id: req.class_id };
    let seat = state.inventory.update_seat_attributes(seat_id, patch).await?;
    Ok(ApiResponse::ok("Seat updated successfully", seat))
}

async fn delete_seat(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(seat_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    state.inventory.delete_seat(seat_id).await?;
    Ok(ApiResponse::ok("Seat deleted successfully", ()))
}

// ============================================================================
// Seat classes
// ============================================================================

async fn list_classes(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
) -> Result<ApiResponse<Vec<SeatClass>>, AppError> {
    let classes = state.inventory.list_seat_classes().await?;
    Ok(ApiResponse::ok("Seat classes fetched", classes))
}

async fn get_class(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Path(class_id): Path<i64>,
) -> Result<ApiResponse<SeatClass>, AppError> {
    let class = state.inventory.get_seat_class(class_id).await?;
    Ok(ApiResponse::ok("Seat class fetched", class))
}

async fn create_class(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<SeatClassRequest>,
) -> Result<ApiResponse<SeatClass>, AppError> {
    let class = state
        .inventory
        .add_seat_class(NewSeatClass { class_name: req.class_name, price_multiplier: req.price_multiplier })
        .await?;
    Ok(ApiResponse::created("Seat class created successfully", class))
}

async fn update_class(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(class_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateSeatClassRequest>,
) -> Result<ApiResponse<SeatClass>, AppError> {
    let patch = SeatClassPatch { class_name: req.class_name, price_multiplier: req.price_multiplier };
    let class = state.inventory.update_seat_class(class_id, patch).await?;
    Ok(ApiResponse::ok("Seat class updated successfully", class))
}

async fn delete_class(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(class_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    state.inventory.delete_seat_class(class_id).await?;
    Ok(ApiResponse::ok("Seat class deleted successfully", ()))
}
