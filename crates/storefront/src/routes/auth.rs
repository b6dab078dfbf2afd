//! Authentication route handlers.
//!
//! Email and password accounts. A successful register or login stores a
//! [`CurrentUser`] in the session; logout removes it.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Login and registration request body.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

async fn sign_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(current)
}

/// `POST /api/auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<Response> {
    let user = AuthService::new(state.pool())
        .register_with_password(&body.email, &body.password)
        .await?;
    let current = sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(current)).into_response())
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;
    let current = sign_in(&session, &user).await?;
    tracing::info!(user_id = %current.id, "User logged in");
    Ok(Json(current))
}

/// `POST /api/auth/logout`
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`
///
/// Re-reads the account, so a deleted user is signed out and a role change
/// is written back to the session.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CurrentUser>> {
    let account = match AuthService::new(state.pool()).get_user(user.id).await {
        Ok(account) => account,
        Err(AuthError::UserNotFound) => {
            tracing::info!("Session user no longer exists, signing out");
            clear_current_user(&session)
                .await
                .map_err(|e| AppError::Internal(format!("session: {e}")))?;
            clear_sentry_user();
            return Err(AuthError::UserNotFound.into());
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser::from(&account);
    if current != user {
        set_current_user(&session, &current)
            .await
            .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    }
    Ok(Json(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let body = CredentialsRequest {
            email: "grower@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        let debug = format!("{body:?}");
        assert!(debug.contains("grower@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
