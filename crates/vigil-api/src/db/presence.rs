//! Presence record persistence operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vigil_core::{PresenceRecord, UserId};

/// Save a presence record to the database (upsert).
pub async fn save(pool: &PgPool, record: &PresenceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO presence_records (user_id, last_checkin_at, interval_days, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE SET
            last_checkin_at = EXCLUDED.last_checkin_at,
            interval_days = EXCLUDED.interval_days",
    )
    .bind(record.user_id.as_uuid())
    .bind(record.last_checkin_at)
    .bind(i32::try_from(record.interval_days).unwrap_or(i32::MAX))
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all presence records from the database for hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<PresenceRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PresenceRow>(
        "SELECT user_id, last_checkin_at, interval_days, created_at
         FROM presence_records ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| PresenceRecord {
            user_id: UserId::from_uuid(r.user_id),
            last_checkin_at: r.last_checkin_at,
            interval_days: u32::try_from(r.interval_days).unwrap_or(1),
            created_at: r.created_at,
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct PresenceRow {
    user_id: Uuid,
    last_checkin_at: Option<DateTime<Utc>>,
    interval_days: i32,
    created_at: DateTime<Utc>,
}
