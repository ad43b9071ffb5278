//! # Trusted Contact Store
//!
//! Each user may designate at most one trusted contact: the person the
//! app expects to be reachable around a release. Contacts carry an email
//! verification lifecycle — a token is issued on request, sent out of
//! band, and redeemed through an unauthenticated link. Changing the
//! contact's email invalidates any prior verification.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use vigil_core::{UserId, ValidationError};
use vigil_crypto::{constant_time_eq, generate_token};

use crate::error::StoreError;

/// Email verification lifecycle of a trusted contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Failed,
}

/// The designated trusted contact of one user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrustedContact {
    pub owner_id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub relationship_to_user: Option<String>,
    pub personal_note: Option<String>,
    pub verification_status: VerificationStatus,
    /// Outstanding verification token, if a verification is in flight.
    #[serde(skip_serializing, default)]
    pub verification_token: Option<String>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields that may change on an update.
#[derive(Debug, Clone, Default)]
pub struct TrustedContactPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub relationship_to_user: Option<Option<String>>,
    pub personal_note: Option<Option<String>>,
}

/// In-memory trusted contact store, keyed by owner (0..1 per user).
pub struct TrustedContactStore {
    contacts: DashMap<UserId, TrustedContact>,
}

impl TrustedContactStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            contacts: DashMap::new(),
        }
    }

    /// Designate a trusted contact. One per user.
    pub fn create(
        &self,
        owner: UserId,
        full_name: &str,
        email: &str,
        phone: Option<String>,
        relationship_to_user: Option<String>,
        personal_note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TrustedContact, StoreError> {
        if full_name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "full_name" }.into());
        }
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "email" }.into());
        }

        match self.contacts.entry(owner) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StoreError::AlreadyExists("trusted contact"))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let contact = TrustedContact {
                    owner_id: owner,
                    full_name: full_name.trim().to_string(),
                    email: email.trim().to_string(),
                    phone,
                    relationship_to_user,
                    personal_note,
                    verification_status: VerificationStatus::Pending,
                    verification_token: None,
                    last_verified_at: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(contact.clone());
                Ok(contact)
            }
        }
    }

    /// Fetch a user's contact.
    pub fn get(&self, owner: UserId) -> Result<TrustedContact, StoreError> {
        self.contacts
            .get(&owner)
            .map(|c| c.value().clone())
            .ok_or(StoreError::NotFound("trusted contact"))
    }

    /// Apply a patch. An email change resets verification to PENDING and
    /// voids any outstanding token.
    pub fn update(
        &self,
        owner: UserId,
        patch: TrustedContactPatch,
        now: DateTime<Utc>,
    ) -> Result<TrustedContact, StoreError> {
        let mut entry = self
            .contacts
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("trusted contact"))?;
        let contact = entry.value_mut();

        if let Some(name) = patch.full_name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyField { field: "full_name" }.into());
            }
            contact.full_name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            if email.trim().is_empty() {
                return Err(ValidationError::EmptyField { field: "email" }.into());
            }
            let email = email.trim().to_string();
            if email != contact.email {
                contact.email = email;
                contact.verification_status = VerificationStatus::Pending;
                contact.verification_token = None;
                contact.last_verified_at = None;
            }
        }
        if let Some(phone) = patch.phone {
            contact.phone = phone;
        }
        if let Some(relationship) = patch.relationship_to_user {
            contact.relationship_to_user = relationship;
        }
        if let Some(note) = patch.personal_note {
            contact.personal_note = note;
        }
        contact.updated_at = now;
        Ok(contact.clone())
    }

    /// Remove a user's contact.
    pub fn delete(&self, owner: UserId) -> Result<(), StoreError> {
        self.contacts
            .remove(&owner)
            .map(|_| ())
            .ok_or(StoreError::NotFound("trusted contact"))
    }

    /// Issue a fresh verification token and reset the status to PENDING.
    /// The caller is responsible for delivering the link.
    pub fn start_verification(
        &self,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Result<(TrustedContact, String), StoreError> {
        let mut entry = self
            .contacts
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("trusted contact"))?;
        let contact = entry.value_mut();

        let token = generate_token();
        contact.verification_token = Some(token.clone());
        contact.verification_status = VerificationStatus::Pending;
        contact.updated_at = now;
        Ok((contact.clone(), token))
    }

    /// Redeem a verification token. Token comparison is constant-time; an
    /// unknown token is indistinguishable from an expired one.
    pub fn verify_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TrustedContact, StoreError> {
        for mut entry in self.contacts.iter_mut() {
            let contact = entry.value_mut();
            let matched = contact
                .verification_token
                .as_deref()
                .is_some_and(|stored| constant_time_eq(stored, token));
            if matched {
                contact.verification_status = VerificationStatus::Verified;
                contact.verification_token = None;
                contact.last_verified_at = Some(now);
                contact.updated_at = now;
                return Ok(contact.clone());
            }
        }
        Err(StoreError::NotFound("verification token"))
    }

    /// Record a failed verification attempt (e.g. the link email bounced).
    pub fn mark_failed(&self, owner: UserId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut entry = self
            .contacts
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("trusted contact"))?;
        let contact = entry.value_mut();
        contact.verification_status = VerificationStatus::Failed;
        contact.updated_at = now;
        Ok(())
    }

    /// Snapshot every contact (persistence).
    pub fn snapshot(&self) -> Vec<TrustedContact> {
        self.contacts.iter().map(|e| e.value().clone()).collect()
    }

    /// Insert a contact record directly (used for hydration from DB).
    pub fn insert_record(&self, contact: TrustedContact) {
        self.contacts.insert(contact.owner_id, contact);
    }
}

impl Default for TrustedContactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TrustedContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedContactStore")
            .field("contacts_count", &self.contacts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 2, 0, 0).unwrap()
    }

    fn create(store: &TrustedContactStore, owner: UserId) -> TrustedContact {
        store
            .create(owner, "Grace Hopper", "grace@example.org", None, None, None, now())
            .unwrap()
    }

    #[test]
    fn one_contact_per_user() {
        let store = TrustedContactStore::new();
        let owner = UserId::new();
        create(&store, owner);
        assert!(matches!(
            store.create(owner, "Second", "x@example.org", None, None, None, now()),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn verification_lifecycle() {
        let store = TrustedContactStore::new();
        let owner = UserId::new();
        create(&store, owner);

        let (_, token) = store.start_verification(owner, now()).unwrap();
        let verified = store.verify_token(&token, now()).unwrap();
        assert_eq!(verified.verification_status, VerificationStatus::Verified);
        assert!(verified.last_verified_at.is_some());
        assert!(verified.verification_token.is_none());

        // Token is single-use.
        assert!(matches!(
            store.verify_token(&token, now()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = TrustedContactStore::new();
        create(&store, UserId::new());
        assert!(store.verify_token("not-a-token", now()).is_err());
    }

    #[test]
    fn email_change_resets_verification() {
        let store = TrustedContactStore::new();
        let owner = UserId::new();
        create(&store, owner);
        let (_, token) = store.start_verification(owner, now()).unwrap();
        store.verify_token(&token, now()).unwrap();

        let updated = store
            .update(
                owner,
                TrustedContactPatch {
                    email: Some("grace@new-host.example".into()),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        assert_eq!(updated.verification_status, VerificationStatus::Pending);
        assert!(updated.last_verified_at.is_none());
    }

    #[test]
    fn same_email_update_keeps_verification() {
        let store = TrustedContactStore::new();
        let owner = UserId::new();
        create(&store, owner);
        let (_, token) = store.start_verification(owner, now()).unwrap();
        store.verify_token(&token, now()).unwrap();

        let updated = store
            .update(
                owner,
                TrustedContactPatch {
                    email: Some("grace@example.org".into()),
                    phone: Some(Some("+1 555 0100".into())),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        assert_eq!(updated.verification_status, VerificationStatus::Verified);
    }

    #[test]
    fn reissuing_a_token_voids_the_previous_one() {
        let store = TrustedContactStore::new();
        let owner = UserId::new();
        create(&store, owner);

        let (_, first) = store.start_verification(owner, now()).unwrap();
        let (_, second) = store.start_verification(owner, now()).unwrap();
        assert!(store.verify_token(&first, now()).is_err());
        assert!(store.verify_token(&second, now()).is_ok());
    }

    #[test]
    fn token_never_serializes() {
        let store = TrustedContactStore::new();
        let owner = UserId::new();
        create(&store, owner);
        let (contact, token) = store.start_verification(owner, now()).unwrap();
        let json = serde_json::to_string(&contact).unwrap();
        assert!(!json.contains(&token));
    }
}
