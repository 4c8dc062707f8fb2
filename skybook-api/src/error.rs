use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use validator::{ValidationErrors, ValidationErrorsKind};

use skybook_core::CoreError;

/// One failed input rule, reported back to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{message}")]
    ValidationError { message: String, fields: Vec<FieldError> },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("Seats unavailable: {}", .0.join(", "))]
    SeatUnavailable(Vec<String>),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError { message: message.into(), fields: Vec::new() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, data) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, Value::Null),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg, Value::Null),
            AppError::ValidationError { message, fields } => {
                let data = if fields.is_empty() { Value::Null } else { json!(fields) };
                (StatusCode::BAD_REQUEST, message, data)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Value::Null),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, Value::Null),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, Value::Null),
            AppError::SeatUnavailable(seats) => (
                StatusCode::CONFLICT,
                format!("Seats unavailable: {}", seats.join(", ")),
                json!({ "conflicting_seats": seats }),
            ),
            AppError::Timeout(msg) => {
                tracing::warn!("Request timed out: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, "Request timed out".to_string(), Value::Null)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), Value::Null)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), Value::Null)
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
            "data": data,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::validation(msg),
            CoreError::InvalidArgument(msg) => AppError::BadRequest(msg),
            err @ CoreError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            CoreError::SeatUnavailable { conflicting_seats } => AppError::SeatUnavailable(conflicting_seats),
            err @ CoreError::AlreadyCancelled(_) => AppError::ConflictError(err.to_string()),
            CoreError::Conflict(msg) => AppError::ConflictError(msg),
            err @ CoreError::Timeout(_) => AppError::Timeout(err.to_string()),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors("", &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationError { message: "Validation failed".to_string(), fields }
    }
}

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {}", error.code));
                    out.push(FieldError { field: path.clone(), message });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 2, message = "too short"))]
        name: String,
        #[validate(range(min = 1, max = 120))]
        age: i32,
    }

    #[test]
    fn test_validation_errors_flatten_to_fields() {
        let probe = Probe { name: "A".to_string(), age: 0 };
        let err = AppError::from(probe.validate().unwrap_err());
        match err {
            AppError::ValidationError { fields, .. } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0], FieldError { field: "age".to_string(), message: "invalid range".to_string() });
                assert_eq!(fields[1].message, "too short");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_opaque_failures_are_redacted() {
        let err = AppError::from(anyhow::anyhow!("password hashing failed: bad salt"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Internal Server Error");
        assert_eq!(body["error"], true);
    }

    #[test]
    fn test_core_errors_map_to_statuses() {
        let cases = [
            (CoreError::NotFound("Booking 3".into()), StatusCode::NOT_FOUND),
            (CoreError::AlreadyCancelled(3), StatusCode::CONFLICT),
            (CoreError::SeatUnavailable { conflicting_seats: vec!["1A".into()] }, StatusCode::CONFLICT),
            (CoreError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::Timeout(std::time::Duration::from_secs(1)), StatusCode::GATEWAY_TIMEOUT),
            (CoreError::InternalError("db down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
