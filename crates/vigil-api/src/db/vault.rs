// SPDX-License-Identifier: AGPL-3.0-or-later
//! Vault persistence operations.
//!
//! Items are stored exactly as they sit in memory: the content column
//! holds the `enc:v1:` envelope string, never plaintext. Recipient
//! assignments travel as a JSONB array of ids.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use vigil_core::{ItemId, RecipientId, UserId};
use vigil_state::{Recipient, VaultItem};

/// Save a recipient to the database (upsert).
pub async fn save_recipient(pool: &PgPool, recipient: &Recipient) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO recipients (id, owner_id, name, email, relationship_description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            email = EXCLUDED.email,
            relationship_description = EXCLUDED.relationship_description,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(recipient.id.as_uuid())
    .bind(recipient.owner_id.as_uuid())
    .bind(&recipient.name)
    .bind(&recipient.email)
    .bind(&recipient.relationship_description)
    .bind(recipient.created_at)
    .bind(recipient.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a recipient row.
pub async fn delete_recipient(pool: &PgPool, id: RecipientId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipients WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Save a vault item to the database (upsert). Ciphertext only.
pub async fn save_item(pool: &PgPool, item: &VaultItem) -> Result<(), sqlx::Error> {
    let recipient_ids_json = serde_json::to_value(&item.recipient_ids)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize recipient_ids: {e}")))?;

    sqlx::query(
        "INSERT INTO vault_items (id, owner_id, title, encrypted_content, recipient_ids, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            encrypted_content = EXCLUDED.encrypted_content,
            recipient_ids = EXCLUDED.recipient_ids,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(item.id.as_uuid())
    .bind(item.owner_id.as_uuid())
    .bind(&item.title)
    .bind(&item.encrypted_content)
    .bind(&recipient_ids_json)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a vault item row.
pub async fn delete_item(pool: &PgPool, id: ItemId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM vault_items WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Load all recipients from the database for hydration.
pub async fn load_all_recipients(pool: &PgPool) -> Result<Vec<Recipient>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RecipientRow>(
        "SELECT id, owner_id, name, email, relationship_description, created_at, updated_at
         FROM recipients ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Recipient {
            id: RecipientId::from_uuid(r.id),
            owner_id: UserId::from_uuid(r.owner_id),
            name: r.name,
            email: r.email,
            relationship_description: r.relationship_description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect())
}

/// Load all vault items from the database for hydration.
pub async fn load_all_items(pool: &PgPool) -> Result<Vec<VaultItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VaultItemRow>(
        "SELECT id, owner_id, title, encrypted_content, recipient_ids, created_at, updated_at
         FROM vault_items ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for r in rows {
        let recipient_ids = serde_json::from_value(r.recipient_ids).map_err(|e| {
            sqlx::Error::Protocol(format!("corrupt recipient_ids in vault item {}: {e}", r.id))
        })?;
        items.push(VaultItem {
            id: ItemId::from_uuid(r.id),
            owner_id: UserId::from_uuid(r.owner_id),
            title: r.title,
            encrypted_content: r.encrypted_content,
            recipient_ids,
            created_at: r.created_at,
            updated_at: r.updated_at,
        });
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct RecipientRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    email: String,
    relationship_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VaultItemRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    encrypted_content: String,
    recipient_ids: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
