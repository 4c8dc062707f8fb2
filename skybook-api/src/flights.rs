use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use skybook_catalog::{RouteInput, RoutePatch};
use skybook_core::{Flight, FlightPatch, FlightRoute, NewFlight, Page, PageRequest, RouteSearch};

use crate::error::AppError;
use crate::extract::{PageParams, ValidatedJson, ValidatedQuery};
use crate::middleware::AdminUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFlightRequest {
    #[validate(length(min = 1, max = 100, message = "airline must be 1-100 characters"))]
    pub airline: String,
    #[validate(length(min = 1, max = 20, message = "flight_number must be 1-20 characters"))]
    pub flight_number: String,
    #[validate(range(min = 1, message = "total_seats must be greater than 0"))]
    pub total_seats: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFlightRequest {
    #[validate(length(min = 1, max = 100, message = "airline must be 1-100 characters"))]
    pub airline: Option<String>,
    #[validate(length(min = 1, max = 20, message = "flight_number must be 1-20 characters"))]
    pub flight_number: Option<String>,
    #[validate(range(min = 1, message = "total_seats must be greater than 0"))]
    pub total_seats: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    pub flight_id: i64,
    #[validate(length(min = 2, max = 50, message = "departure_city must be 2-50 characters"))]
    pub departure_city: String,
    #[validate(length(min = 2, max = 50, message = "arrival_city must be 2-50 characters"))]
    pub arrival_city: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub gst: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRouteRequest {
    #[validate(length(min = 2, max = 50, message = "departure_city must be 2-50 characters"))]
    pub departure_city: Option<String>,
    #[validate(length(min = 2, max = 50, message = "arrival_city must be 2-50 characters"))]
    pub arrival_city: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub base_price: Option<Decimal>,
    pub gst: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, message = "departure_city is required"))]
    pub departure_city: String,
    #[validate(length(min = 1, message = "arrival_city is required"))]
    pub arrival_city: String,
    pub date: NaiveDate,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FlightSeats {
    pub flight_id: i64,
    pub available_seats: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_flights).post(create_flight))
        .route("/search", get(search_routes))
        .route("/{id}", get(get_flight).put(update_flight).delete(delete_flight))
        .route("/{id}/seats", get(flight_seats))
        .route("/routes", post(create_route))
        .route("/routes/{id}", get(get_route).put(update_route).delete(delete_route))
}

// ============================================================================
// Flights
// ============================================================================

async fn list_flights(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<ApiResponse<Page<Flight>>, AppError> {
    let page = state.flights.list_flights(params.request()).await?;
    Ok(ApiResponse::ok("Flights fetched", page))
}

async fn get_flight(State(state): State<AppState>, Path(flight_id): Path<i64>) -> Result<ApiResponse<Flight>, AppError> {
    let flight = state.flights.get_flight(flight_id).await?;
    Ok(ApiResponse::ok("Flight fetched", flight))
}

async fn flight_seats(
    State(state): State<AppState>,
    Path(flight_id): Path<i64>,
) -> Result<ApiResponse<FlightSeats>, AppError> {
    let available_seats = state.inventory.available_seats(flight_id).await?;
    Ok(ApiResponse::ok("Available seats fetched", FlightSeats { flight_id, available_seats }))
}

async fn create_flight(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<CreateFlightRequest>,
) -> Result<ApiResponse<Flight>, AppError> {
    let flight = state
        .flights
        .add_flight(NewFlight { airline: req.airline, flight_number: req.flight_number, total_seats: req.total_seats })
        .await?;
    Ok(ApiResponse::created("Flight created successfully", flight))
}

async fn update_flight(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(flight_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateFlightRequest>,
) -> Result<ApiResponse<Flight>, AppError> {
    let patch = FlightPatch { airline: req.airline, flight_number: req.flight_number, total_seats: req.total_seats };
    let flight = state.flights.update_flight(flight_id, patch).await?;
    Ok(ApiResponse::ok("Flight updated successfully", flight))
}

async fn delete_flight(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(flight_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    state.flights.delete_flight(flight_id).await?;
    Ok(ApiResponse::ok("Flight deleted successfully", ()))
}

// ============================================================================
// Routes
// ============================================================================

async fn search_routes(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> Result<ApiResponse<Page<FlightRoute>>, AppError> {
    let search = RouteSearch {
        departure_city: params.departure_city,
        arrival_city: params.arrival_city,
        date: params.date,
    };
    let page = state
        .routes
        .search_routes(search, PageRequest::new(params.page, params.per_page))
        .await?;
    Ok(ApiResponse::ok("Routes fetched", page))
}

async fn get_route(State(state): State<AppState>, Path(route_id): Path<i64>) -> Result<ApiResponse<FlightRoute>, AppError> {
    let route = state.routes.get_route(route_id).await?;
    Ok(ApiResponse::ok("Route fetched", route))
}

async fn create_route(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedJson(req): ValidatedJson<CreateRouteRequest>,
) -> Result<ApiResponse<FlightRoute>, AppError> {
    let input = RouteInput {
        flight_id: req.flight_id,
        departure_city: req.departure_city,
        arrival_city: req.arrival_city,
        departure_time: req.departure_time,
        arrival_time: req.arrival_time,
        base_price: req.base_price,
        gst: req.gst,
    };
    let route = state.routes.add_route(input).await?;
    Ok(ApiResponse::created("Route created successfully", route))
}

async fn update_route(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(route_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateRouteRequest>,
) -> Result<ApiResponse<FlightRoute>, AppError> {
    let patch = RoutePatch {
        departure_city: req.departure_city,
        arrival_city: req.arrival_city,
        departure_time: req.departure_time,
        arrival_time: req.arrival_time,
        base_price: req.base_price,
        gst: req.gst,
    };
    let route = state.routes.update_route(route_id, patch).await?;
    Ok(ApiResponse::ok("Route updated successfully", route))
}

async fn delete_route(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(route_id): Path<i64>,
) -> Result<ApiResponse<()>, AppError> {
    state.routes.delete_route(route_id).await?;
    Ok(ApiResponse::ok("Route deleted successfully", ()))
}
