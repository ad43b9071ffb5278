//! Financial obligation persistence operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vigil_core::{ObligationId, UserId};
use vigil_state::{FinancialObligation, Money, ObligationStatus};

/// Save an obligation to the database (upsert).
pub async fn save(pool: &PgPool, obligation: &FinancialObligation) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO obligations (id, owner_id, creditor_name, amount_minor, currency, description, due_date, status, created_at, updated_at, settled_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (id) DO UPDATE SET
            creditor_name = EXCLUDED.creditor_name,
            amount_minor = EXCLUDED.amount_minor,
            currency = EXCLUDED.currency,
            description = EXCLUDED.description,
            due_date = EXCLUDED.due_date,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at,
            settled_at = EXCLUDED.settled_at",
    )
    .bind(obligation.id.as_uuid())
    .bind(obligation.owner_id.as_uuid())
    .bind(&obligation.creditor_name)
    .bind(obligation.amount.amount_minor)
    .bind(&obligation.amount.currency)
    .bind(&obligation.description)
    .bind(obligation.due_date)
    .bind(status_str(obligation.status))
    .bind(obligation.created_at)
    .bind(obligation.updated_at)
    .bind(obligation.settled_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete an obligation row.
pub async fn delete(pool: &PgPool, id: ObligationId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM obligations WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Load all obligations from the database for hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<FinancialObligation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ObligationRow>(
        "SELECT id, owner_id, creditor_name, amount_minor, currency, description, due_date, status, created_at, updated_at, settled_at
         FROM obligations ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| FinancialObligation {
            id: ObligationId::from_uuid(r.id),
            owner_id: UserId::from_uuid(r.owner_id),
            creditor_name: r.creditor_name,
            amount: Money {
                amount_minor: r.amount_minor,
                currency: r.currency,
            },
            description: r.description,
            due_date: r.due_date,
            status: parse_status(&r.status),
            created_at: r.created_at,
            updated_at: r.updated_at,
            settled_at: r.settled_at,
        })
        .collect())
}

fn status_str(status: ObligationStatus) -> &'static str {
    match status {
        ObligationStatus::Outstanding => "OUTSTANDING",
        ObligationStatus::Settled => "SETTLED",
    }
}

fn parse_status(s: &str) -> ObligationStatus {
    match s {
        "SETTLED" => ObligationStatus::Settled,
        "OUTSTANDING" => ObligationStatus::Outstanding,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized obligation status in database, defaulting to OUTSTANDING"
            );
            ObligationStatus::Outstanding
        }
    }
}

#[derive(sqlx::FromRow)]
struct ObligationRow {
    id: Uuid,
    owner_id: Uuid,
    creditor_name: String,
    amount_minor: i64,
    currency: String,
    description: Option<String>,
    due_date: Option<NaiveDate>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}
