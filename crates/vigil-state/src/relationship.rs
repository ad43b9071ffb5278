//! # Relationship Journal
//!
//! Lightweight journal of the user's important relationships and their
//! current state. Each state maps to a display indicator (label + score)
//! the frontend renders; the mapping is fixed here so every client agrees.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use vigil_core::{RelationshipId, UserId, ValidationError};

use crate::error::StoreError;

/// Current state of a relationship, as self-reported by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipState {
    Strong,
    GoodButDistant,
    Unclear,
    Tense,
    Hurt,
}

impl RelationshipState {
    /// Display indicator: a label and a 1..=5 score.
    pub fn indicator(&self) -> (&'static str, u8) {
        match self {
            Self::Strong => ("Stable", 5),
            Self::GoodButDistant => ("Open", 4),
            Self::Unclear => ("Needs attention", 3),
            Self::Tense => ("Fragile", 2),
            Self::Hurt => ("In repair", 1),
        }
    }
}

/// One relationship journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Relationship {
    pub id: RelationshipId,
    pub owner_id: UserId,
    pub name: String,
    pub relationship_type: Option<String>,
    pub state: RelationshipState,
    pub notes: Option<String>,
    pub last_interaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields that may change on an update.
#[derive(Debug, Clone, Default)]
pub struct RelationshipPatch {
    pub name: Option<String>,
    pub relationship_type: Option<Option<String>>,
    pub state: Option<RelationshipState>,
    pub notes: Option<Option<String>>,
    pub last_interaction_at: Option<Option<DateTime<Utc>>>,
}

/// In-memory relationship journal store.
pub struct RelationshipStore {
    relationships: DashMap<UserId, BTreeMap<RelationshipId, Relationship>>,
}

impl RelationshipStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            relationships: DashMap::new(),
        }
    }

    /// Add a journal entry.
    pub fn create(
        &self,
        owner: UserId,
        name: &str,
        relationship_type: Option<String>,
        state: RelationshipState,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Relationship, StoreError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" }.into());
        }
        let relationship = Relationship {
            id: RelationshipId::new(),
            owner_id: owner,
            name: name.trim().to_string(),
            relationship_type,
            state,
            notes,
            last_interaction_at: None,
            created_at: now,
            updated_at: now,
        };
        self.relationships
            .entry(owner)
            .or_default()
            .insert(relationship.id, relationship.clone());
        Ok(relationship)
    }

    /// List a user's journal, in stable id order.
    pub fn list(&self, owner: UserId) -> Vec<Relationship> {
        self.relationships
            .get(&owner)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Fetch one entry.
    pub fn get(&self, owner: UserId, id: RelationshipId) -> Result<Relationship, StoreError> {
        self.relationships
            .get(&owner)
            .and_then(|m| m.get(&id).cloned())
            .ok_or(StoreError::NotFound("relationship"))
    }

    /// Apply a patch.
    pub fn update(
        &self,
        owner: UserId,
        id: RelationshipId,
        patch: RelationshipPatch,
        now: DateTime<Utc>,
    ) -> Result<Relationship, StoreError> {
        let mut entry = self
            .relationships
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("relationship"))?;
        let relationship = entry
            .get_mut(&id)
            .ok_or(StoreError::NotFound("relationship"))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyField { field: "name" }.into());
            }
            relationship.name = name.trim().to_string();
        }
        if let Some(relationship_type) = patch.relationship_type {
            relationship.relationship_type = relationship_type;
        }
        if let Some(state) = patch.state {
            relationship.state = state;
        }
        if let Some(notes) = patch.notes {
            relationship.notes = notes;
        }
        if let Some(last_interaction_at) = patch.last_interaction_at {
            relationship.last_interaction_at = last_interaction_at;
        }
        relationship.updated_at = now;
        Ok(relationship.clone())
    }

    /// Delete an entry.
    pub fn delete(&self, owner: UserId, id: RelationshipId) -> Result<(), StoreError> {
        self.relationships
            .get_mut(&owner)
            .and_then(|mut m| m.remove(&id))
            .map(|_| ())
            .ok_or(StoreError::NotFound("relationship"))
    }

    /// Snapshot every entry (persistence).
    pub fn snapshot(&self) -> Vec<Relationship> {
        self.relationships
            .iter()
            .flat_map(|e| e.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Insert an entry directly (used for hydration from DB).
    pub fn insert_record(&self, relationship: Relationship) {
        self.relationships
            .entry(relationship.owner_id)
            .or_default()
            .insert(relationship.id, relationship);
    }
}

impl Default for RelationshipStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RelationshipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipStore")
            .field("owners_count", &self.relationships.len())
            .finish()
    }
}
