//! Relationship journal persistence operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vigil_core::{RelationshipId, UserId};
use vigil_state::{Relationship, RelationshipState};

/// Save a journal entry to the database (upsert).
pub async fn save(pool: &PgPool, relationship: &Relationship) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO relationships (id, owner_id, name, relationship_type, state, notes, last_interaction_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            relationship_type = EXCLUDED.relationship_type,
            state = EXCLUDED.state,
            notes = EXCLUDED.notes,
            last_interaction_at = EXCLUDED.last_interaction_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(relationship.id.as_uuid())
    .bind(relationship.owner_id.as_uuid())
    .bind(&relationship.name)
    .bind(&relationship.relationship_type)
    .bind(state_str(relationship.state))
    .bind(&relationship.notes)
    .bind(relationship.last_interaction_at)
    .bind(relationship.created_at)
    .bind(relationship.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a journal entry row.
pub async fn delete(pool: &PgPool, id: RelationshipId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM relationships WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Load all journal entries from the database for hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Relationship>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RelationshipRow>(
        "SELECT id, owner_id, name, relationship_type, state, notes, last_interaction_at, created_at, updated_at
         FROM relationships ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Relationship {
            id: RelationshipId::from_uuid(r.id),
            owner_id: UserId::from_uuid(r.owner_id),
            name: r.name,
            relationship_type: r.relationship_type,
            state: parse_state(&r.state),
            notes: r.notes,
            last_interaction_at: r.last_interaction_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect())
}

fn state_str(state: RelationshipState) -> &'static str {
    match state {
        RelationshipState::Strong => "STRONG",
        RelationshipState::GoodButDistant => "GOOD_BUT_DISTANT",
        RelationshipState::Unclear => "UNCLEAR",
        RelationshipState::Tense => "TENSE",
        RelationshipState::Hurt => "HURT",
    }
}

fn parse_state(s: &str) -> RelationshipState {
    match s {
        "STRONG" => RelationshipState::Strong,
        "GOOD_BUT_DISTANT" => RelationshipState::GoodButDistant,
        "UNCLEAR" => RelationshipState::Unclear,
        "TENSE" => RelationshipState::Tense,
        "HURT" => RelationshipState::Hurt,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized relationship state in database, defaulting to UNCLEAR"
            );
            RelationshipState::Unclear
        }
    }
}

#[derive(sqlx::FromRow)]
struct RelationshipRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    relationship_type: Option<String>,
    state: String,
    notes: Option<String>,
    last_interaction_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
