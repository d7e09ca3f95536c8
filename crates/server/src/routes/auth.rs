//! Account registration, login, and session handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use validator::Validate;

use crate::db::UserRepository;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::RequireUser;
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

fn current_user_of(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
    }
}

/// Register a new customer account and start a session.
///
/// # Errors
///
/// Returns `AppError::Conflict` if the email is taken, or validation errors
/// for malformed input.
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;

    let user = AuthService::new(state.pool())
        .register(&payload.email, &payload.password, &payload.name)
        .await?;

    set_current_user(&session, &current_user_of(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(user.id.as_i64(), Some(user.email.as_str()));

    Ok(Json(user))
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for bad credentials.
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;

    let user = AuthService::new(state.pool())
        .login(&payload.email, &payload.password)
        .await?;

    // Rotate the session ID on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session rotation failed: {e}")))?;
    set_current_user(&session, &current_user_of(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(user.id.as_i64(), Some(user.email.as_str()));

    Ok(Json(user))
}

/// End the current session.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session cannot be modified.
async fn logout(session: Session) -> Result<Json<serde_json::Value>, AppError> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session clear failed: {e}")))?;
    clear_sentry_user();

    Ok(Json(serde_json::json!({ "logged_out": true })))
}

/// The logged-in account, read fresh from the database so role changes
/// made by an admin show up without re-login.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the session user no longer exists.
async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<User>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))?;

    Ok(Json(user))
}
