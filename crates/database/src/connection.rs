use crate::error::DbError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The pool is shared across the entire application; every request borrows a
/// connection for the duration of a single query.
pub async fn connect(database_url: &str) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!("Database pool ready.");
    Ok(pool)
}

/// Applies the embedded migrations, including the seed rows for the default categories.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
