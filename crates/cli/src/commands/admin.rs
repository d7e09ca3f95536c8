//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a platform admin (password generated and printed when omitted)
//! portobello admin create -e ops@example.com -n "Ops"
//!
//! # Promote an existing account to vendor
//! portobello admin promote -e seller@example.com -r vendor
//! ```

use tracing::info;

use portobello_core::{Email, UserRole};

use super::{CommandError, connect, hash_password, random_password};

/// Minimum length accepted for an explicitly supplied password.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Create a new platform admin account.
///
/// When `password` is omitted a random one is generated and printed once;
/// it is not stored anywhere in recoverable form.
///
/// # Errors
///
/// Returns `CommandError::Invalid` for malformed emails, weak passwords,
/// or an already-registered email.
pub async fn create(email: &str, name: &str, password: Option<&str>) -> Result<(), CommandError> {
    let email = Email::parse(email)
        .map_err(|e| CommandError::Invalid(format!("invalid email: {e}")))?;

    if password.is_some_and(|p| p.len() < MIN_PASSWORD_LENGTH) {
        return Err(CommandError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let pool = connect().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(CommandError::Invalid(format!(
            "an account already exists for {}",
            email.as_str()
        )));
    }

    let generated = password.is_none();
    let password = password.map_or_else(random_password, ToOwned::to_owned);
    let password_hash = hash_password(&password)?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, name, role)
         VALUES ($1, $2, $3, 'admin')
         RETURNING id",
    )
    .bind(email.as_str())
    .bind(&password_hash)
    .bind(name)
    .fetch_one(&pool)
    .await?;

    info!("Admin account created: id {id}, email {}", email.as_str());
    if generated {
        // Shown once; only the argon2 hash is stored.
        #[allow(clippy::print_stdout)]
        {
            println!("Generated password: {password}");
        }
    }

    Ok(())
}

/// Change an existing account's platform role.
///
/// # Errors
///
/// Returns `CommandError::Invalid` for unknown roles, malformed emails, or
/// emails with no account.
pub async fn promote(email: &str, role: &str) -> Result<(), CommandError> {
    let role = UserRole::parse(role).ok_or_else(|| {
        CommandError::Invalid(format!(
            "invalid role: {role}. Valid roles: customer, vendor, admin"
        ))
    })?;
    let email = Email::parse(email)
        .map_err(|e| CommandError::Invalid(format!("invalid email: {e}")))?;

    let pool = connect().await?;

    let result = sqlx::query(
        "UPDATE users SET role = $2::user_role, updated_at = NOW() WHERE email = $1",
    )
    .bind(email.as_str())
    .bind(role.as_str())
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CommandError::Invalid(format!(
            "no account found for {}",
            email.as_str()
        )));
    }

    info!("{} is now a {}", email.as_str(), role.as_str());
    Ok(())
}
