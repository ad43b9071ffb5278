//! # Presence Store
//!
//! Per-user check-in state. Check-ins are idempotent writes of the
//! current instant; interval changes take effect immediately, which can
//! make a user overdue (or safe) the moment the new bound applies.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use vigil_core::{PresenceRecord, PresenceStatus, UserId};

use crate::error::StoreError;

/// In-memory presence store.
///
/// Thread-safe via `DashMap`, keyed by user. Records are created lazily on
/// first touch and never deleted while the user exists.
pub struct PresenceStore {
    records: DashMap<UserId, PresenceRecord>,
}

impl PresenceStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Ensure a record exists for `user`, creating one with the default
    /// interval if needed.
    pub fn ensure(&self, user: UserId, now: DateTime<Utc>) {
        self.records
            .entry(user)
            .or_insert_with(|| PresenceRecord::new(user, now));
    }

    /// Record a check-in at `now`. Idempotent: repeating the call within
    /// the same instant is a no-op in effect.
    pub fn record_checkin(&self, user: UserId, now: DateTime<Utc>) -> PresenceStatus {
        let mut entry = self
            .records
            .entry(user)
            .or_insert_with(|| PresenceRecord::new(user, now));
        entry.last_checkin_at = Some(now);
        entry.status_at(now)
    }

    /// Reconfigure the check-in interval. Bounds are validated by
    /// [`PresenceRecord::set_interval`].
    pub fn set_interval(
        &self,
        user: UserId,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<PresenceStatus, StoreError> {
        let mut entry = self
            .records
            .entry(user)
            .or_insert_with(|| PresenceRecord::new(user, now));
        entry.set_interval(days)?;
        Ok(entry.status_at(now))
    }

    /// Evaluate a user's presence at `now`.
    pub fn status(&self, user: UserId, now: DateTime<Utc>) -> Result<PresenceStatus, StoreError> {
        self.records
            .get(&user)
            .map(|r| r.status_at(now))
            .ok_or(StoreError::NotFound("presence record"))
    }

    /// Fetch one user's raw record (persistence mirroring).
    pub fn record(&self, user: UserId) -> Option<PresenceRecord> {
        self.records.get(&user).map(|r| r.value().clone())
    }

    /// Snapshot every record (sweep and persistence).
    pub fn snapshot(&self) -> Vec<PresenceRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    /// Insert a record directly (used for hydration from DB).
    pub fn insert_record(&self, record: PresenceRecord) {
        self.records.insert(record.user_id, record);
    }
}

impl Default for PresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceStore")
            .field("records_count", &self.records.len())
            .finish()
    }
}
