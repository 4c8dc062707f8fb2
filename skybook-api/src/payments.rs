use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use skybook_booking::PaymentRequest;
use skybook_core::{Payment, PaymentStatus};

use crate::bookings::ensure_booking_access;
use crate::error::AppError;
use crate::extract::{positive_amount, ValidatedJson};
use crate::middleware::auth::ensure_owner_or_admin;
use crate::middleware::{AuthUser, Identity};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub booking_id: i64,
    /// Defaults to the caller.
    pub user_id: Option<i64>,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    pub payment_status: Option<PaymentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/{id}", get(get_payment).put(update_payment).delete(delete_payment))
        .route("/booking/{booking_id}", get(booking_payments))
}

async fn ensure_payment_access(state: &AppState, identity: &Identity, payment_id: i64) -> Result<Payment, AppError> {
    let payment = state.payments.get_payment(payment_id).await?;
    ensure_owner_or_admin(state, identity, payment.user_id).await?;
    Ok(payment)
}

async fn create_payment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> Result<ApiResponse<Payment>, AppError> {
    ensure_booking_access(&state, &identity, req.booking_id).await?;
    let user_id = req.user_id.unwrap_or(identity.user_id);
    ensure_owner_or_admin(&state, &identity, user_id).await?;

    let payment = state
        .payments
        .add_payment(PaymentRequest {
            booking_id: req.booking_id,
            user_id,
            amount: req.amount,
            payment_status: req.payment_status.unwrap_or(PaymentStatus::Pending),
            payment_date: req.payment_date,
        })
        .await?;
    Ok(ApiResponse::created("Payment recorded successfully", payment))
}

async fn get_payment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(payment_id): Path<i64>,
) -> Result<ApiResponse<Payment>, AppError> {
    let payment = ensure_payment_access(&state, &identity, payment_id).await?;
    Ok(ApiResponse::ok("Payment fetched", payment))
}

async fn update_payment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(payment_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentRequest>,
) -> Result<ApiResponse<Payment>, AppError> {
    ensure_payment_access(&state, &identity, payment_id).await?;
    let payment = state.payments.update_payment_status(payment_id, req.payment_status).await?;
    Ok(ApiResponse::ok("Payment status updated", payment))
}

async fn delete_payment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(payment_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    ensure_payment_access(&state, &identity, payment_id).await?;
    state.payments.delete_payment(payment_id).await?;
    Ok(ApiResponse::ok("Payment deleted successfully", ()))
}

async fn booking_payments(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(booking_id): Path<i64>,
) -> Result<ApiResponse<Vec<Payment>>, AppError> {
    ensure_booking_access(&state, &identity, booking_id).await?;
    let payments = state.payments.payments_for_booking(booking_id).await?;
    Ok(ApiResponse::ok("Payments fetched", payments))
}
