// SPDX-License-Identifier: AGPL-3.0-or-later
//! # Vault Store
//!
//! Recipients and encrypted legacy items, with the many-to-many assignment
//! between them. Plaintext crosses this module's boundary in exactly three
//! places: `create_item`, `update_item` (inbound, encrypted before the map
//! insert), and `materialize_for_release` (outbound, for the release engine
//! and the simulate dry run). Everything at rest is an `enc:v1:` envelope.
//!
//! Recipient deletion cascades out of every item's assignment set. An item
//! left with no recipients is legal but unpublishable: it is skipped by
//! materialization, never an error.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use vigil_core::{ItemId, RecipientId, UserId, ValidationError};
use vigil_crypto::VaultCipher;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// A trusted recipient of released vault items.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recipient {
    pub id: RecipientId,
    pub owner_id: UserId,
    pub name: String,
    pub email: String,
    pub relationship_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An encrypted legacy item as stored. `encrypted_content` is a versioned
/// AEAD envelope string; the plaintext never appears in this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultItem {
    pub id: ItemId,
    pub owner_id: UserId,
    pub title: String,
    pub encrypted_content: String,
    pub recipient_ids: BTreeSet<RecipientId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item metadata for listings. Carries no content, encrypted or otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub recipient_ids: Vec<RecipientId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&VaultItem> for ItemSummary {
    fn from(item: &VaultItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            recipient_ids: item.recipient_ids.iter().copied().collect(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// A decrypted item as handed to the release engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasedItem {
    pub title: String,
    pub plaintext: String,
}

/// Fields that may change on a recipient update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub relationship_description: Option<Option<String>>,
}

/// Fields that may change on an item update. A `plaintext` patch
/// re-encrypts; everything else leaves the ciphertext untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub plaintext: Option<String>,
    pub recipient_ids: Option<Vec<RecipientId>>,
}

// ---------------------------------------------------------------------------
// Vault Store
// ---------------------------------------------------------------------------

/// In-memory vault store, holding the cipher that seals its contents.
///
/// Both maps are keyed by owner so different users never contend. The two
/// maps are never locked simultaneously: cascades and materialization
/// clone what they need out of one map before touching the other.
pub struct VaultStore {
    cipher: Arc<VaultCipher>,
    recipients: DashMap<UserId, BTreeMap<RecipientId, Recipient>>,
    items: DashMap<UserId, BTreeMap<ItemId, VaultItem>>,
}

impl VaultStore {
    /// Create an empty store sealing with `cipher`.
    pub fn new(cipher: Arc<VaultCipher>) -> Self {
        Self {
            cipher,
            recipients: DashMap::new(),
            items: DashMap::new(),
        }
    }

    // -- recipients ---------------------------------------------------------

    /// Add a recipient for `owner`.
    pub fn add_recipient(
        &self,
        owner: UserId,
        name: &str,
        email: &str,
        relationship_description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Recipient, StoreError> {
        require_nonempty("name", name)?;
        require_nonempty("email", email)?;

        let recipient = Recipient {
            id: RecipientId::new(),
            owner_id: owner,
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            relationship_description,
            created_at: now,
            updated_at: now,
        };
        self.recipients
            .entry(owner)
            .or_default()
            .insert(recipient.id, recipient.clone());
        Ok(recipient)
    }

    /// List recipients for `owner`, in stable id order.
    pub fn list_recipients(&self, owner: UserId) -> Vec<Recipient> {
        self.recipients
            .get(&owner)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Fetch one recipient.
    pub fn get_recipient(&self, owner: UserId, id: RecipientId) -> Result<Recipient, StoreError> {
        self.recipients
            .get(&owner)
            .and_then(|m| m.get(&id).cloned())
            .ok_or(StoreError::NotFound("recipient"))
    }

    /// Update a recipient's fields.
    pub fn update_recipient(
        &self,
        owner: UserId,
        id: RecipientId,
        patch: RecipientPatch,
        now: DateTime<Utc>,
    ) -> Result<Recipient, StoreError> {
        let mut entry = self
            .recipients
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("recipient"))?;
        let recipient = entry
            .get_mut(&id)
            .ok_or(StoreError::NotFound("recipient"))?;

        if let Some(name) = patch.name {
            require_nonempty("name", &name)?;
            recipient.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            require_nonempty("email", &email)?;
            recipient.email = email.trim().to_string();
        }
        if let Some(description) = patch.relationship_description {
            recipient.relationship_description = description;
        }
        recipient.updated_at = now;
        Ok(recipient.clone())
    }

    /// Delete a recipient and cascade it out of every item's assignment set.
    pub fn delete_recipient(&self, owner: UserId, id: RecipientId) -> Result<(), StoreError> {
        let removed = self
            .recipients
            .get_mut(&owner)
            .and_then(|mut m| m.remove(&id));
        if removed.is_none() {
            return Err(StoreError::NotFound("recipient"));
        }

        // Recipient map lock is released above; now cascade.
        if let Some(mut items) = self.items.get_mut(&owner) {
            for item in items.values_mut() {
                item.recipient_ids.remove(&id);
            }
        }
        Ok(())
    }

    // -- items --------------------------------------------------------------

    /// Encrypt and store a new item.
    pub fn create_item(
        &self,
        owner: UserId,
        title: &str,
        plaintext: &str,
        recipient_ids: Vec<RecipientId>,
        now: DateTime<Utc>,
    ) -> Result<ItemSummary, StoreError> {
        require_nonempty("title", title)?;
        let assigned = self.validate_assignment(owner, recipient_ids)?;

        let encrypted_content = self.cipher.encrypt(owner, plaintext.as_bytes())?;
        let item = VaultItem {
            id: ItemId::new(),
            owner_id: owner,
            title: title.trim().to_string(),
            encrypted_content,
            recipient_ids: assigned,
            created_at: now,
            updated_at: now,
        };
        let summary = ItemSummary::from(&item);
        self.items.entry(owner).or_default().insert(item.id, item);
        Ok(summary)
    }

    /// List item metadata for `owner`, oldest first.
    pub fn list_items(&self, owner: UserId) -> Vec<ItemSummary> {
        let mut items: Vec<ItemSummary> = self
            .items
            .get(&owner)
            .map(|m| m.values().map(ItemSummary::from).collect())
            .unwrap_or_default();
        items.sort_by_key(|i| (i.created_at, i.id));
        items
    }

    /// Apply a patch to an item. Content patches re-encrypt under the same
    /// entry lock, so a reader never observes a half-updated item.
    pub fn update_item(
        &self,
        owner: UserId,
        id: ItemId,
        patch: ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<ItemSummary, StoreError> {
        // Validate the assignment and encrypt before taking the item lock.
        let assigned = match patch.recipient_ids {
            Some(ids) => Some(self.validate_assignment(owner, ids)?),
            None => None,
        };
        let encrypted = match patch.plaintext {
            Some(ref plaintext) => Some(self.cipher.encrypt(owner, plaintext.as_bytes())?),
            None => None,
        };

        let mut entry = self
            .items
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("vault item"))?;
        let item = entry.get_mut(&id).ok_or(StoreError::NotFound("vault item"))?;

        if let Some(title) = patch.title {
            require_nonempty("title", &title)?;
            item.title = title.trim().to_string();
        }
        if let Some(encrypted_content) = encrypted {
            item.encrypted_content = encrypted_content;
        }
        if let Some(recipient_ids) = assigned {
            item.recipient_ids = recipient_ids;
        }
        item.updated_at = now;
        Ok(ItemSummary::from(&*item))
    }

    /// Delete an item.
    pub fn delete_item(&self, owner: UserId, id: ItemId) -> Result<(), StoreError> {
        self.items
            .get_mut(&owner)
            .and_then(|mut m| m.remove(&id))
            .map(|_| ())
            .ok_or(StoreError::NotFound("vault item"))
    }

    // -- release path -------------------------------------------------------

    /// Decrypt the owner's vault and group it per recipient.
    ///
    /// This is the only plaintext egress path. Items with an empty
    /// assignment set are skipped; recipients with nothing assigned do not
    /// appear in the result. Any undecryptable envelope fails the whole
    /// batch, which the release engine treats as fatal before any send.
    pub fn materialize_for_release(
        &self,
        owner: UserId,
    ) -> Result<Vec<(Recipient, Vec<ReleasedItem>)>, StoreError> {
        // Clone out of the maps first; decryption runs without any lock held.
        let mut items: Vec<VaultItem> = self
            .items
            .get(&owner)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        // Recipients see items oldest first, not in map key order.
        items.sort_by_key(|i| (i.created_at, i.id));
        let recipients: BTreeMap<RecipientId, Recipient> = self
            .recipients
            .get(&owner)
            .map(|m| m.value().clone())
            .unwrap_or_default();

        let mut grouped: BTreeMap<RecipientId, Vec<ReleasedItem>> = BTreeMap::new();
        for item in &items {
            if item.recipient_ids.is_empty() {
                continue;
            }
            let plaintext = self.cipher.decrypt(owner, &item.encrypted_content)?;
            let plaintext = String::from_utf8_lossy(&plaintext).into_owned();
            for rid in &item.recipient_ids {
                // Stale assignment to a since-deleted recipient is skipped.
                if !recipients.contains_key(rid) {
                    continue;
                }
                grouped.entry(*rid).or_default().push(ReleasedItem {
                    title: item.title.clone(),
                    plaintext: plaintext.clone(),
                });
            }
        }

        let mut bundle: Vec<(Recipient, Vec<ReleasedItem>)> = grouped
            .into_iter()
            .filter_map(|(rid, released)| {
                recipients.get(&rid).map(|r| (r.clone(), released))
            })
            .collect();
        // Recipient order is stable too: oldest designation first.
        bundle.sort_by_key(|(r, _)| (r.created_at, r.id));
        Ok(bundle)
    }

    // -- persistence --------------------------------------------------------

    /// Snapshot all recipients (persistence).
    pub fn snapshot_recipients(&self) -> Vec<Recipient> {
        self.recipients
            .iter()
            .flat_map(|e| e.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Snapshot all items, ciphertext included (persistence).
    pub fn snapshot_items(&self) -> Vec<VaultItem> {
        self.items
            .iter()
            .flat_map(|e| e.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Insert a recipient record directly (used for hydration from DB).
    pub fn insert_recipient_record(&self, recipient: Recipient) {
        self.recipients
            .entry(recipient.owner_id)
            .or_default()
            .insert(recipient.id, recipient);
    }

    /// Insert an item record directly (used for hydration from DB).
    pub fn insert_item_record(&self, item: VaultItem) {
        self.items
            .entry(item.owner_id)
            .or_default()
            .insert(item.id, item);
    }

    // -- helpers ------------------------------------------------------------

    /// Check that an assignment set is non-empty and owned by `owner`.
    fn validate_assignment(
        &self,
        owner: UserId,
        ids: Vec<RecipientId>,
    ) -> Result<BTreeSet<RecipientId>, StoreError> {
        let assigned: BTreeSet<RecipientId> = ids.into_iter().collect();
        if assigned.is_empty() {
            return Err(ValidationError::EmptyRecipients.into());
        }
        let owned = self.recipients.get(&owner);
        for rid in &assigned {
            let known = owned.as_ref().is_some_and(|m| m.contains_key(rid));
            if !known {
                return Err(ValidationError::ForeignRecipient(*rid).into());
            }
        }
        Ok(assigned)
    }
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("owners_with_items", &self.items.len())
            .finish_non_exhaustive()
    }
}

fn require_nonempty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> VaultStore {
        VaultStore::new(Arc::new(VaultCipher::from_bytes([3u8; 32])))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn recipient(store: &VaultStore, owner: UserId, name: &str) -> Recipient {
        store
            .add_recipient(owner, name, &format!("{name}@example.org"), None, now())
            .unwrap()
    }

    #[test]
    fn create_item_requires_recipients() {
        let store = store();
        let owner = UserId::new();
        let err = store
            .create_item(owner, "letter", "dear all", vec![], now())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyRecipients)
        ));
    }

    #[test]
    fn create_item_rejects_foreign_recipient() {
        let store = store();
        let owner = UserId::new();
        let other = UserId::new();
        let foreign = recipient(&store, other, "mallory");

        let err = store
            .create_item(owner, "letter", "dear all", vec![foreign.id], now())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::ForeignRecipient(_))
        ));
    }

    #[test]
    fn stored_item_never_contains_plaintext() {
        let store = store();
        let owner = UserId::new();
        let r = recipient(&store, owner, "ada");
        store
            .create_item(owner, "letter", "the plaintext secret", vec![r.id], now())
            .unwrap();

        let snapshot = store.snapshot_items();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].encrypted_content.starts_with("enc:v1:"));
        assert!(!snapshot[0].encrypted_content.contains("plaintext secret"));
    }

    #[test]
    fn materialize_round_trips_plaintext() {
        let store = store();
        let owner = UserId::new();
        let r = recipient(&store, owner, "ada");
        store
            .create_item(owner, "letter", "dear ada", vec![r.id], now())
            .unwrap();

        let bundle = store.materialize_for_release(owner).unwrap();
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle[0].0.id, r.id);
        assert_eq!(
            bundle[0].1,
            vec![ReleasedItem {
                title: "letter".into(),
                plaintext: "dear ada".into()
            }]
        );
    }

    #[test]
    fn items_surface_in_creation_order() {
        let store = store();
        let owner = UserId::new();
        let r = recipient(&store, owner, "ada");
        for (minutes, title) in [(0, "first"), (1, "second"), (2, "third")] {
            store
                .create_item(
                    owner,
                    title,
                    "x",
                    vec![r.id],
                    now() + chrono::Duration::minutes(minutes),
                )
                .unwrap();
        }

        let listed: Vec<String> = store
            .list_items(owner)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(listed, ["first", "second", "third"]);

        let bundle = store.materialize_for_release(owner).unwrap();
        let released: Vec<&str> = bundle[0].1.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(released, ["first", "second", "third"]);
    }

    #[test]
    fn recipient_deletion_cascades_out_of_items() {
        let store = store();
        let owner = UserId::new();
        let a = recipient(&store, owner, "ada");
        let b = recipient(&store, owner, "bob");
        let item = store
            .create_item(owner, "letter", "dear both", vec![a.id, b.id], now())
            .unwrap();

        store.delete_recipient(owner, a.id).unwrap();

        let items = store.list_items(owner);
        assert_eq!(items[0].id, item.id);
        assert_eq!(items[0].recipient_ids, vec![b.id]);
    }

    #[test]
    fn fully_orphaned_item_is_skipped_without_error() {
        let store = store();
        let owner = UserId::new();
        let a = recipient(&store, owner, "ada");
        store
            .create_item(owner, "letter", "dear ada", vec![a.id], now())
            .unwrap();
        store.delete_recipient(owner, a.id).unwrap();

        let bundle = store.materialize_for_release(owner).unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn metadata_patch_leaves_ciphertext_intact() {
        let store = store();
        let owner = UserId::new();
        let r = recipient(&store, owner, "ada");
        store
            .create_item(owner, "letter", "dear ada", vec![r.id], now())
            .unwrap();
        let before = store.snapshot_items()[0].encrypted_content.clone();

        let item_id = store.list_items(owner)[0].id;
        store
            .update_item(
                owner,
                item_id,
                ItemPatch {
                    title: Some("final letter".into()),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();

        let after = store.snapshot_items()[0].encrypted_content.clone();
        assert_eq!(before, after);
        assert_eq!(store.list_items(owner)[0].title, "final letter");
    }

    #[test]
    fn content_patch_reencrypts() {
        let store = store();
        let owner = UserId::new();
        let r = recipient(&store, owner, "ada");
        store
            .create_item(owner, "letter", "first draft", vec![r.id], now())
            .unwrap();
        let item_id = store.list_items(owner)[0].id;

        store
            .update_item(
                owner,
                item_id,
                ItemPatch {
                    plaintext: Some("second draft".into()),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();

        let bundle = store.materialize_for_release(owner).unwrap();
        assert_eq!(bundle[0].1[0].plaintext, "second draft");
    }

    #[test]
    fn corrupt_envelope_fails_the_whole_batch() {
        let store = store();
        let owner = UserId::new();
        let r = recipient(&store, owner, "ada");
        store
            .create_item(owner, "ok", "fine", vec![r.id], now())
            .unwrap();

        // Inject a row sealed under a different master key, as a key
        // rotation gone wrong would produce.
        let alien = VaultCipher::from_bytes([9u8; 32])
            .encrypt(owner, b"unreadable")
            .unwrap();
        let mut bad = store.snapshot_items()[0].clone();
        bad.id = ItemId::new();
        bad.encrypted_content = alien;
        store.insert_item_record(bad);

        assert!(matches!(
            store.materialize_for_release(owner),
            Err(StoreError::Crypto(_))
        ));
    }

    #[test]
    fn item_access_is_owner_scoped() {
        let store = store();
        let owner = UserId::new();
        let intruder = UserId::new();
        let r = recipient(&store, owner, "ada");
        store
            .create_item(owner, "letter", "private", vec![r.id], now())
            .unwrap();
        let item_id = store.list_items(owner)[0].id;

        assert!(matches!(
            store.delete_item(intruder, item_id),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_items(intruder).is_empty());
    }
}
