//! Database migration command.
//!
//! Applies the server crate's SQL migrations to the database named by
//! `DATABASE_URL`. The server never migrates on startup, so this command is
//! the only thing that changes the schema.

use tracing::info;

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Migrate` when a migration fails to apply and
/// `CommandError::Database` when the connection fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    info!("Running marketplace migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    info!("Migrations complete");
    Ok(())
}
