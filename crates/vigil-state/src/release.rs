// SPDX-License-Identifier: AGPL-3.0-or-later
//! # Release Log
//!
//! Release attempt records and the state machine that serializes them.
//! Each record moves `PENDING → IN_PROGRESS → {COMPLETED, FAILED}`;
//! COMPLETED is terminal, FAILED may be retried with a fresh record.
//!
//! The claim is the single cross-request serialization point in Vigil:
//! it is a conditional insert under the owner's entry lock, so of two
//! concurrent triggers exactly one obtains a record and the other gets
//! [`StoreError::AlreadyInProgress`]. There is never a read-then-write
//! window.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use vigil_core::{RecipientId, ReleaseId, UserId};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Lifecycle state of a release attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ReleaseStatus {
    /// Wire/storage name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// True while the record blocks new claims for its owner.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::str::FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown release status: {other}")),
        }
    }
}

/// Result of one send attempt to one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Sent,
    Failed,
}

/// Per-recipient outcome recorded on a finished release. Carries counts
/// and error strings only, never message content.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipientOutcome {
    pub recipient_id: RecipientId,
    pub recipient_email: String,
    pub status: OutcomeStatus,
    pub error: Option<String>,
    pub messages_count: u32,
}

/// One release attempt, from claim to terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReleaseRecord {
    pub id: ReleaseId,
    pub owner_id: UserId,
    pub triggered_at: DateTime<Utc>,
    pub days_overdue: u32,
    pub is_demo: bool,
    pub status: ReleaseStatus,
    pub outcomes: Vec<RecipientOutcome>,
    /// Fatal error detail when `status == FAILED`.
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Release Log
// ---------------------------------------------------------------------------

/// In-memory release log.
///
/// Thread-safe via `DashMap`, keyed by owner. All transitions validate the
/// current state under the entry lock.
pub struct ReleaseLog {
    records: DashMap<UserId, Vec<ReleaseRecord>>,
}

impl ReleaseLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Atomically claim the release slot for `owner`.
    ///
    /// Fails with [`StoreError::AlreadyInProgress`] if any PENDING or
    /// IN_PROGRESS record exists. On success a PENDING record is inserted
    /// and its id returned; the caller must drive it to a terminal state
    /// (or rely on a check-in clearing it while still PENDING).
    pub fn claim(
        &self,
        owner: UserId,
        triggered_at: DateTime<Utc>,
        days_overdue: u32,
        is_demo: bool,
    ) -> Result<ReleaseId, StoreError> {
        let mut entry = self.records.entry(owner).or_default();
        if entry.iter().any(|r| r.status.is_active()) {
            return Err(StoreError::AlreadyInProgress);
        }
        let record = ReleaseRecord {
            id: ReleaseId::new(),
            owner_id: owner,
            triggered_at,
            days_overdue,
            is_demo,
            status: ReleaseStatus::Pending,
            outcomes: Vec::new(),
            error: None,
            updated_at: triggered_at,
        };
        let id = record.id;
        entry.push(record);
        Ok(id)
    }

    /// Move a claimed record from PENDING to IN_PROGRESS.
    pub fn begin(&self, owner: UserId, id: ReleaseId, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.transition(owner, id, now, ReleaseStatus::InProgress, |r| {
            r.status == ReleaseStatus::Pending
        })
    }

    /// Terminate a record as COMPLETED, attaching per-recipient outcomes.
    pub fn complete(
        &self,
        owner: UserId,
        id: ReleaseId,
        outcomes: Vec<RecipientOutcome>,
        now: DateTime<Utc>,
    ) -> Result<ReleaseRecord, StoreError> {
        self.transition_with(owner, id, now, ReleaseStatus::Completed, |r| {
            if r.status != ReleaseStatus::InProgress {
                return false;
            }
            r.outcomes = outcomes.clone();
            true
        })
    }

    /// Terminate a record as FAILED with a fatal error. Legal from PENDING
    /// (claim bookkeeping failed) or IN_PROGRESS (fatal pre-send error).
    pub fn fail(
        &self,
        owner: UserId,
        id: ReleaseId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<ReleaseRecord, StoreError> {
        self.transition_with(owner, id, now, ReleaseStatus::Failed, |r| {
            if !r.status.is_active() {
                return false;
            }
            r.error = Some(error.to_string());
            true
        })
    }

    /// Drop all PENDING records for `owner` (a check-in re-arms the
    /// switch). IN_PROGRESS records are left alone: an in-flight release
    /// is never cancelled.
    pub fn clear_pending(&self, owner: UserId) -> usize {
        match self.records.get_mut(&owner) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|r| r.status != ReleaseStatus::Pending);
                before - entry.len()
            }
            None => 0,
        }
    }

    /// Fetch one record.
    pub fn get(&self, owner: UserId, id: ReleaseId) -> Result<ReleaseRecord, StoreError> {
        self.records
            .get(&owner)
            .and_then(|v| v.iter().find(|r| r.id == id).cloned())
            .ok_or(StoreError::NotFound("release record"))
    }

    /// List an owner's records, oldest first.
    pub fn list(&self, owner: UserId) -> Vec<ReleaseRecord> {
        self.records
            .get(&owner)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot every record (persistence and metrics).
    pub fn snapshot(&self) -> Vec<ReleaseRecord> {
        self.records
            .iter()
            .flat_map(|e| e.value().clone())
            .collect()
    }

    /// Insert a record directly (used for hydration from DB).
    pub fn insert_record(&self, record: ReleaseRecord) {
        self.records.entry(record.owner_id).or_default().push(record);
    }

    // -- helpers ------------------------------------------------------------

    fn transition(
        &self,
        owner: UserId,
        id: ReleaseId,
        now: DateTime<Utc>,
        to: ReleaseStatus,
        guard: impl FnMut(&mut ReleaseRecord) -> bool,
    ) -> Result<(), StoreError> {
        self.transition_with(owner, id, now, to, guard).map(|_| ())
    }

    /// Guarded transition under the owner's entry lock. The guard checks
    /// the source state and may attach payload; returning false rejects
    /// the transition.
    fn transition_with(
        &self,
        owner: UserId,
        id: ReleaseId,
        now: DateTime<Utc>,
        to: ReleaseStatus,
        mut guard: impl FnMut(&mut ReleaseRecord) -> bool,
    ) -> Result<ReleaseRecord, StoreError> {
        let mut entry = self
            .records
            .get_mut(&owner)
            .ok_or(StoreError::NotFound("release record"))?;
        let record = entry
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound("release record"))?;

        let from = record.status;
        if !guard(record) {
            return Err(StoreError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        record.status = to;
        record.updated_at = now;
        Ok(record.clone())
    }
}

impl Default for ReleaseLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReleaseLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseLog")
            .field("owners_count", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()
    }

    fn sent(recipient_email: &str) -> RecipientOutcome {
        RecipientOutcome {
            recipient_id: RecipientId::new(),
            recipient_email: recipient_email.to_string(),
            status: OutcomeStatus::Sent,
            error: None,
            messages_count: 1,
        }
    }

    #[test]
    fn claim_is_exclusive_while_active() {
        let log = ReleaseLog::new();
        let owner = UserId::new();

        let id = log.claim(owner, now(), 31, false).unwrap();
        assert!(matches!(
            log.claim(owner, now(), 31, false),
            Err(StoreError::AlreadyInProgress)
        ));

        // Still exclusive once in progress.
        log.begin(owner, id, now()).unwrap();
        assert!(matches!(
            log.claim(owner, now(), 31, false),
            Err(StoreError::AlreadyInProgress)
        ));
    }

    #[test]
    fn claims_for_different_owners_are_independent() {
        let log = ReleaseLog::new();
        assert!(log.claim(UserId::new(), now(), 0, true).is_ok());
        assert!(log.claim(UserId::new(), now(), 0, true).is_ok());
    }

    #[test]
    fn completed_frees_the_slot() {
        let log = ReleaseLog::new();
        let owner = UserId::new();
        let id = log.claim(owner, now(), 31, false).unwrap();
        log.begin(owner, id, now()).unwrap();
        log.complete(owner, id, vec![sent("a@example.org")], now())
            .unwrap();

        assert!(log.claim(owner, now(), 32, false).is_ok());
    }

    #[test]
    fn failed_may_be_retried_with_a_fresh_record() {
        let log = ReleaseLog::new();
        let owner = UserId::new();
        let id = log.claim(owner, now(), 31, false).unwrap();
        log.begin(owner, id, now()).unwrap();
        log.fail(owner, id, "vault decryption failed", now()).unwrap();

        let retry = log.claim(owner, now(), 32, false).unwrap();
        assert_ne!(retry, id);
        assert_eq!(log.list(owner).len(), 2);
    }

    #[test]
    fn completed_is_terminal() {
        let log = ReleaseLog::new();
        let owner = UserId::new();
        let id = log.claim(owner, now(), 31, false).unwrap();
        log.begin(owner, id, now()).unwrap();
        log.complete(owner, id, vec![], now()).unwrap();

        assert!(matches!(
            log.begin(owner, id, now()),
            Err(StoreError::InvalidTransition { from: "COMPLETED", .. })
        ));
        assert!(matches!(
            log.fail(owner, id, "late", now()),
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn complete_requires_in_progress() {
        let log = ReleaseLog::new();
        let owner = UserId::new();
        let id = log.claim(owner, now(), 31, false).unwrap();
        assert!(matches!(
            log.complete(owner, id, vec![], now()),
            Err(StoreError::InvalidTransition { from: "PENDING", .. })
        ));
    }

    #[test]
    fn clear_pending_spares_in_progress() {
        let log = ReleaseLog::new();
        let owner = UserId::new();

        log.claim(owner, now(), 31, false).unwrap();
        assert_eq!(log.clear_pending(owner), 1);
        assert!(log.claim(owner, now(), 31, false).is_ok());

        // Advance the fresh claim; a check-in must not cancel it now.
        let id2 = log.list(owner).last().unwrap().id;
        log.begin(owner, id2, now()).unwrap();
        assert_eq!(log.clear_pending(owner), 0);
        assert!(matches!(
            log.claim(owner, now(), 31, false),
            Err(StoreError::AlreadyInProgress)
        ));
    }

    #[test]
    fn concurrent_claims_admit_exactly_one() {
        use std::sync::Arc;

        let log = Arc::new(ReleaseLog::new());
        let owner = UserId::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || log.claim(owner, now(), 31, false).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn outcome_serialization_uses_wire_names() {
        let json = serde_json::to_string(&OutcomeStatus::Sent).unwrap();
        assert_eq!(json, "\"SENT\"");
        let json = serde_json::to_string(&ReleaseStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn status_round_trips_through_from_str() {
        for s in ["PENDING", "IN_PROGRESS", "COMPLETED", "FAILED"] {
            let parsed: ReleaseStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!("DONE".parse::<ReleaseStatus>().is_err());
    }
}
