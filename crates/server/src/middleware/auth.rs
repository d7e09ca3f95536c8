//! Authentication extractors for the three marketplace surfaces.
//!
//! Handlers declare the access level they need by taking one of these
//! extractors; the session carries the [`CurrentUser`] written at login.
//! All surfaces are JSON APIs, so rejections are JSON error responses
//! rather than login redirects.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use portobello_core::UserRole;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires any logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("hello, {}", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires a vendor account.
pub struct RequireVendor(pub CurrentUser);

/// Extractor that requires a platform admin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that reads the current user without rejecting guests.
pub struct OptionalUser(pub Option<CurrentUser>);

/// Read the session user out of the request, if any.
async fn session_user(parts: &mut Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))
    }
}

impl<S> FromRequestParts<S> for RequireVendor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        if user.role != UserRole::Vendor {
            return Err(AppError::Forbidden(
                "vendor account required".to_string(),
            ));
        }

        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or_else(|| AppError::Unauthorized("login required".to_string()))?;

        if user.role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "admin account required".to_string(),
            ));
        }

        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Write the current user into the session at login.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
