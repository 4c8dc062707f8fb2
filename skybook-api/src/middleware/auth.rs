use anyhow::Context;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use skybook_core::{bounded, CoreError, User, UserRole};

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

/// Caller identity as asserted by a verified token.
///
/// `role` is what the token was issued with. Admin decisions never trust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.user_id.to_string(),
        email: user.email.clone(),
        role: user.user_role.to_string(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .context("token encoding failed")?;
    Ok(token)
}

pub fn authenticate(auth: &AuthConfig, token: &str) -> Result<Identity, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::AuthenticationError("Invalid or expired token".to_string())
    })?;

    let claims = token_data.claims;
    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthenticationError("Invalid or expired token".to_string()))?;

    Ok(Identity { user_id, email: claims.email, role: claims.role })
}

/// Loads the caller's account and requires its current role to be ADMIN.
pub async fn authorize_admin(state: &AppState, identity: &Identity) -> Result<User, AppError> {
    let user = current_user(state, identity.user_id).await?;
    match user {
        Some(user) if user.user_role == UserRole::Admin => Ok(user),
        _ => Err(AppError::AuthorizationError("Admin access required".to_string())),
    }
}

/// Passes when the caller owns the resource or is currently an admin.
pub async fn ensure_owner_or_admin(state: &AppState, identity: &Identity, owner_id: i64) -> Result<(), AppError> {
    if identity.user_id == owner_id {
        return Ok(());
    }
    authorize_admin(state, identity)
        .await
        .map(|_| ())
        .map_err(|_| AppError::AuthorizationError("Not allowed to access this resource".to_string()))
}

async fn current_user(state: &AppState, user_id: i64) -> Result<Option<User>, AppError> {
    let user = bounded(state.timeout, async {
        let mut tx = state.store.begin().await?;
        Ok::<_, CoreError>(tx.get_user(user_id).await?)
    })
    .await?;
    Ok(user)
}

// ============================================================================
// Extractors
// ============================================================================

/// Any caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthenticationError("Missing bearer token".to_string()))?;

        let identity = authenticate(&state.auth, bearer.token())?;
        Ok(AuthUser(identity))
    }
}

/// A caller whose account is ADMIN right now, whatever the token claims.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        let user = authorize_admin(state, &identity).await?;
        Ok(AdminUser(user))
    }
}
