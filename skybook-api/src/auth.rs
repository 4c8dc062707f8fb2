use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use skybook_core::{bounded, CoreError, Gender, NewUser, Page, User, UserPatch, UserRole};

use crate::error::AppError;
use crate::extract::{strong_password, ten_digit_phone, PageParams, ValidatedJson, ValidatedQuery};
use crate::middleware::auth::{ensure_owner_or_admin, issue_token};
use crate::middleware::{AdminUser, AuthUser};
use crate::response::ApiResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "name must be 2-50 characters"))]
    pub name: String,
    #[validate(range(min = 1, max = 120, message = "age must be between 1 and 120"))]
    pub age: i32,
    pub gender: Gender,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(
        length(min = 6, message = "password must be at least 6 characters"),
        custom(function = "strong_password")
    )]
    pub password: String,
    #[validate(custom(function = "ten_digit_phone"))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "name must be 2-50 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 120, message = "age must be between 1 and 120"))]
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    #[validate(email(message = "email is not valid"))]
    pub email: Option<String>,
    #[validate(
        length(min = 6, message = "password must be at least 6 characters"),
        custom(function = "strong_password")
    )]
    pub password: Option<String>,
    #[validate(custom(function = "ten_digit_phone"))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub email: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile/{id}", get(profile))
        .route("/update", put(update_profile))
        .route("/allUser", get(all_users))
}

// ============================================================================
// Password hashing
// ============================================================================

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let email = normalize_email(&req.email);
    let user_role = if state.auth.is_admin_email(&email) { UserRole::Admin } else { UserRole::Customer };
    let new_user = NewUser {
        name: req.name.trim().to_string(),
        age: req.age,
        gender: req.gender,
        email,
        password_hash: hash_password(&req.password)?,
        phone: req.phone,
        user_role,
    };

    let user = bounded(state.timeout, async {
        let mut tx = state.store.begin().await?;
        let user = tx
            .insert_user(&new_user)
            .await
            .map_err(|e| CoreError::conflict_on_constraint(e, "Email already registered"))?;
        tx.commit().await?;
        Ok::<_, CoreError>(user)
    })
    .await?;

    info!("Registered user {} ({})", user.user_id, user.user_role);
    Ok(ApiResponse::created("User registered successfully", user))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let email = normalize_email(&req.email);
    let user = bounded(state.timeout, async {
        let mut tx = state.store.begin().await?;
        Ok::<_, CoreError>(tx.find_user_by_email(&email).await?)
    })
    .await?;

    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => return Err(AppError::AuthenticationError("Invalid credentials".to_string())),
    };

    let token = issue_token(&state.auth, &user)?;
    Ok(ApiResponse::ok(
        "Login successful",
        LoginResponse { token, user_id: user.user_id, email: user.email },
    ))
}

async fn profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<User>, AppError> {
    ensure_owner_or_admin(&state, &identity, user_id).await?;

    let user = bounded(state.timeout, async {
        let mut tx = state.store.begin().await?;
        tx.get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User {}", user_id)))
    })
    .await?;

    Ok(ApiResponse::ok("Profile fetched", user))
}

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<User>, AppError> {
    let patch = UserPatch {
        name: req.name.map(|n| n.trim().to_string()),
        age: req.age,
        gender: req.gender,
        email: req.email.as_deref().map(normalize_email),
        password_hash: req.password.as_deref().map(hash_password).transpose()?,
        phone: req.phone,
    };
    if patch.is_empty() {
        return Err(AppError::validation("At least one field must be provided"));
    }

    let user = bounded(state.timeout, async {
        let mut tx = state.store.begin().await?;
        let user = tx
            .update_user(identity.user_id, &patch)
            .await
            .map_err(|e| CoreError::conflict_on_constraint(e, "Email already registered"))?
            .ok_or_else(|| CoreError::NotFound(format!("User {}", identity.user_id)))?;
        tx.commit().await?;
        Ok::<_, CoreError>(user)
    })
    .await?;

    info!("Updated profile of user {}", user.user_id);
    Ok(ApiResponse::ok("Profile updated successfully", user))
}

async fn all_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> Result<ApiResponse<Page<User>>, AppError> {
    let request = params.request();
    let page = bounded(state.timeout, async {
        let mut tx = state.store.begin().await?;
        let users = tx.list_users(&request).await?;
        let total = tx.count_users().await?;
        Ok::<_, CoreError>(Page::new(users, request, total))
    })
    .await?;

    Ok(ApiResponse::ok("Users fetched", page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("Secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret1", &hash));
        assert!(!verify_password("Secret2", &hash));
        assert!(!verify_password("Secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_register_rules() {
        let req = RegisterRequest {
            name: "A".to_string(),
            age: 0,
            gender: Gender::Other,
            email: "nope".to_string(),
            password: "weak".to_string(),
            phone: "123".to_string(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["name", "age", "email", "password", "phone"] {
            assert!(fields.contains_key(field), "missing error for {}", field);
        }
    }
}
