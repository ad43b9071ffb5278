//! Trusted contact persistence operations.
//!
//! The verification token column is persisted so an in-flight link
//! survives a restart; it is keyed by owner because each user has at
//! most one contact.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vigil_core::UserId;
use vigil_state::{TrustedContact, VerificationStatus};

/// Save a trusted contact to the database (upsert).
pub async fn save(pool: &PgPool, contact: &TrustedContact) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO trusted_contacts (owner_id, full_name, email, phone, relationship_to_user, personal_note, verification_status, verification_token, last_verified_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         ON CONFLICT (owner_id) DO UPDATE SET
            full_name = EXCLUDED.full_name,
            email = EXCLUDED.email,
            phone = EXCLUDED.phone,
            relationship_to_user = EXCLUDED.relationship_to_user,
            personal_note = EXCLUDED.personal_note,
            verification_status = EXCLUDED.verification_status,
            verification_token = EXCLUDED.verification_token,
            last_verified_at = EXCLUDED.last_verified_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(contact.owner_id.as_uuid())
    .bind(&contact.full_name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.relationship_to_user)
    .bind(&contact.personal_note)
    .bind(status_str(contact.verification_status))
    .bind(&contact.verification_token)
    .bind(contact.last_verified_at)
    .bind(contact.created_at)
    .bind(contact.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a trusted contact row.
pub async fn delete(pool: &PgPool, owner: UserId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM trusted_contacts WHERE owner_id = $1")
        .bind(owner.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Load all trusted contacts from the database for hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<TrustedContact>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TrustedContactRow>(
        "SELECT owner_id, full_name, email, phone, relationship_to_user, personal_note, verification_status, verification_token, last_verified_at, created_at, updated_at
         FROM trusted_contacts ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| TrustedContact {
            owner_id: UserId::from_uuid(r.owner_id),
            full_name: r.full_name,
            email: r.email,
            phone: r.phone,
            relationship_to_user: r.relationship_to_user,
            personal_note: r.personal_note,
            verification_status: parse_status(&r.verification_status),
            verification_token: r.verification_token,
            last_verified_at: r.last_verified_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect())
}

fn status_str(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pending => "PENDING",
        VerificationStatus::Verified => "VERIFIED",
        VerificationStatus::Failed => "FAILED",
    }
}

fn parse_status(s: &str) -> VerificationStatus {
    match s {
        "VERIFIED" => VerificationStatus::Verified,
        "FAILED" => VerificationStatus::Failed,
        "PENDING" => VerificationStatus::Pending,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized verification status in database, defaulting to PENDING"
            );
            VerificationStatus::Pending
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrustedContactRow {
    owner_id: Uuid,
    full_name: String,
    email: String,
    phone: Option<String>,
    relationship_to_user: Option<String>,
    personal_note: Option<String>,
    verification_status: String,
    verification_token: Option<String>,
    last_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
