use axum::{extract::State, routing::post, Router};
use tracing::info;

use skybook_booking::ReconciliationReport;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/reconcile", post(reconcile))
}

async fn reconcile(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<ApiResponse<ReconciliationReport>, AppError> {
    info!("Reconciliation triggered by admin {}", admin.user_id);
    let report = state.reconciler.run_once().await?;
    let message = if report.is_clean() { "Nothing to repair" } else { "Inconsistencies repaired" };
    Ok(ApiResponse::ok(message, report))
}
