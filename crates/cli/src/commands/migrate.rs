//! Database migration commands.
//!
//! Migration files live in `crates/commerce/migrations/` and are embedded
//! into this binary at compile time.

use super::CommandError;

/// Apply pending commerce migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    tracing::info!("Running commerce migrations...");
    sqlx::migrate!("../commerce/migrations").run(&pool).await?;

    tracing::info!("Commerce migrations complete!");
    Ok(())
}
