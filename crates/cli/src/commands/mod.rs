//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Password hashing failed.
    #[error("Password hashing error")]
    Hashing,

    /// Invalid command input.
    #[error("{0}")]
    Invalid(String),
}

/// Connect to the marketplace database named by `DATABASE_URL`.
///
/// # Errors
///
/// Returns `CommandError::MissingEnvVar` when `DATABASE_URL` is unset and
/// `CommandError::Database` when the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    use secrecy::ExposeSecret;
    let pool = PgPool::connect(database_url.expose_secret()).await?;
    Ok(pool)
}

/// Hash a password with argon2id and a fresh salt, matching the server's
/// login verification.
pub(crate) fn hash_password(password: &str) -> Result<String, CommandError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CommandError::Hashing)
}

/// Generate a random alphanumeric password for accounts created without one.
pub(crate) fn random_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}
