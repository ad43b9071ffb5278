//! Release record persistence operations.
//!
//! Per-recipient outcomes are stored as a JSONB array on the record
//! rather than a child table; a release is always written and read
//! whole.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vigil_core::{ReleaseId, UserId};
use vigil_state::{ReleaseRecord, ReleaseStatus};

/// Save a release record to the database (upsert).
pub async fn save(pool: &PgPool, record: &ReleaseRecord) -> Result<(), sqlx::Error> {
    let outcomes_json = serde_json::to_value(&record.outcomes)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize outcomes: {e}")))?;

    sqlx::query(
        "INSERT INTO releases (id, owner_id, triggered_at, days_overdue, is_demo, status, outcomes, error, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            outcomes = EXCLUDED.outcomes,
            error = EXCLUDED.error,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(record.id.as_uuid())
    .bind(record.owner_id.as_uuid())
    .bind(record.triggered_at)
    .bind(i32::try_from(record.days_overdue).unwrap_or(i32::MAX))
    .bind(record.is_demo)
    .bind(record.status.as_str())
    .bind(&outcomes_json)
    .bind(&record.error)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all release records from the database for hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<ReleaseRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReleaseRow>(
        "SELECT id, owner_id, triggered_at, days_overdue, is_demo, status, outcomes, error, updated_at
         FROM releases ORDER BY triggered_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for r in rows {
        let outcomes = serde_json::from_value(r.outcomes).map_err(|e| {
            sqlx::Error::Protocol(format!("corrupt outcomes in release {}: {e}", r.id))
        })?;
        records.push(ReleaseRecord {
            id: ReleaseId::from_uuid(r.id),
            owner_id: UserId::from_uuid(r.owner_id),
            triggered_at: r.triggered_at,
            days_overdue: u32::try_from(r.days_overdue).unwrap_or(0),
            is_demo: r.is_demo,
            status: parse_status(&r.status),
            outcomes,
            error: r.error,
            updated_at: r.updated_at,
        });
    }
    Ok(records)
}

fn parse_status(s: &str) -> ReleaseStatus {
    ReleaseStatus::from_str(s).unwrap_or_else(|_| {
        tracing::warn!(
            value = s,
            "unrecognized release status in database, defaulting to FAILED"
        );
        ReleaseStatus::Failed
    })
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: Uuid,
    owner_id: Uuid,
    triggered_at: DateTime<Utc>,
    days_overdue: i32,
    is_demo: bool,
    status: String,
    outcomes: serde_json::Value,
    error: Option<String>,
    updated_at: DateTime<Utc>,
}
