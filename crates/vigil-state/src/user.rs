//! # User Store
//!
//! Registered accounts. Emails are unique case-insensitively; password
//! hashes are Argon2id PHC strings produced by `vigil-crypto` and treated
//! as opaque here.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use vigil_core::{UserId, ValidationError};

use crate::error::StoreError;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Argon2id PHC string. Never serialized to clients; the API layer
    /// exposes only id and email.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory user store with a unique email index.
pub struct UserStore {
    by_id: DashMap<UserId, User>,
    by_email: DashMap<String, UserId>,
}

impl UserStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_email: DashMap::new(),
        }
    }

    /// Register an account. The email index entry is the uniqueness gate:
    /// the insert happens under its entry lock, so two concurrent
    /// registrations of one address cannot both win.
    pub fn register(
        &self,
        email: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::EmptyField { field: "email" }.into());
        }

        match self.by_email.entry(email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::EmailTaken),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let user = User {
                    id: UserId::new(),
                    email,
                    password_hash,
                    created_at: now,
                };
                slot.insert(user.id);
                self.by_id.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    /// Fetch an account by id.
    pub fn get(&self, id: UserId) -> Result<User, StoreError> {
        self.by_id
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::NotFound("user"))
    }

    /// Fetch an account by email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let id = *self.by_email.get(&email.trim().to_lowercase())?;
        self.by_id.get(&id).map(|u| u.value().clone())
    }

    /// Number of registered accounts (metrics).
    pub fn count(&self) -> usize {
        self.by_id.len()
    }

    /// Snapshot every account (persistence).
    pub fn snapshot(&self) -> Vec<User> {
        self.by_id.iter().map(|e| e.value().clone()).collect()
    }

    /// Insert an account directly (used for hydration from DB).
    pub fn insert_record(&self, user: User) {
        self.by_email.insert(user.email.clone(), user.id);
        self.by_id.insert(user.id, user);
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("users_count", &self.by_id.len())
            .finish()
    }
}
