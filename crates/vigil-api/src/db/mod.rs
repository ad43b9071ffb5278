//! # Database Persistence Layer
//!
//! Optional Postgres mirroring via SQLx.
//!
//! The in-memory stores are the runtime source of truth. When
//! `DATABASE_URL` is set, every mutation is mirrored here best-effort and
//! the stores are hydrated from these tables once at startup. When it is
//! absent, the API runs in-memory only (development and testing).
//!
//! What is persisted:
//!
//! - Accounts and presence records
//! - Recipients and encrypted vault items (ciphertext only — envelopes go
//!   to the database exactly as they sit in memory)
//! - Financial obligations
//! - Trusted contacts (including any in-flight verification token, so a
//!   pending link survives a restart)
//! - Relationship journal entries
//! - Release records with their per-recipient outcomes
//!
//! The obligation audit log is deliberately not persisted; it is a
//! per-process trail rebuilt from subsequent activity.

pub mod obligations;
pub mod presence;
pub mod relationships;
pub mod releases;
pub mod trusted;
pub mod users;
pub mod vault;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
