use axum::{http::Method, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod extract;
pub mod flights;
pub mod middleware;
pub mod payments;
pub mod response;
pub mod seats;
pub mod state;
pub mod worker;

pub use error::AppError;
pub use state::{AppState, AuthConfig};

use response::ApiResponse;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/flight", flights::routes())
        .nest("/seats", seats::routes())
        .nest("/bookings", bookings::routes())
        .nest("/payments", payments::routes())
        .nest("/admin", admin::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> ApiResponse<()> {
    ApiResponse::ok("OK", ())
}
