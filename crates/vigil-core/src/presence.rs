//! # Presence Records and the Overdue Evaluator
//!
//! A [`PresenceRecord`] tracks when a user last confirmed they are alive
//! and how long they may remain silent before the release engine considers
//! them overdue. The evaluator here is deliberately pure: it takes the
//! record and an explicit `now`, and returns a verdict. Both the
//! `/checkin/status` endpoint and the scheduled release sweep call the same
//! functions, so they can never disagree about the boundary.
//!
//! ## Boundary Semantics
//!
//! Elapsed days are computed by integer truncation of the signed duration,
//! not calendar rounding: a check-in at 23:00 on day 0 evaluated at 01:00
//! on day 1 counts as 0 whole days; the user becomes overdue at the exact
//! instant `last_checkin_at + interval_days` is reached
//! (`days_since >= interval_days`).
//!
//! A user who has never checked in has no anchor to measure from and is
//! never overdue on elapsed time alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::identity::UserId;

/// Default check-in interval for newly registered users.
pub const DEFAULT_INTERVAL_DAYS: u32 = 30;

/// Upper bound on the configurable interval (two years).
pub const MAX_INTERVAL_DAYS: u32 = 730;

/// Per-user presence state: last check-in anchor and configured interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    /// `None` until the first check-in ever occurs.
    pub last_checkin_at: Option<DateTime<Utc>>,
    /// Inactivity window in whole days. Always `>= 1`.
    pub interval_days: u32,
    pub created_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Create the initial record for a user, with the default interval and
    /// no check-in anchor.
    pub fn new(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            last_checkin_at: None,
            interval_days: DEFAULT_INTERVAL_DAYS,
            created_at,
        }
    }

    /// Replace the interval, validating bounds.
    pub fn set_interval(&mut self, days: u32) -> Result<(), ValidationError> {
        if days == 0 || days > MAX_INTERVAL_DAYS {
            return Err(ValidationError::InvalidInterval(days));
        }
        self.interval_days = days;
        Ok(())
    }

    /// Evaluate this record at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> PresenceStatus {
        let days_since = self.last_checkin_at.map(|t0| days_between(t0, now));
        PresenceStatus {
            last_checkin_at: self.last_checkin_at,
            interval_days: self.interval_days,
            days_since_last_checkin: days_since,
            overdue: is_overdue(days_since, self.interval_days),
        }
    }
}

/// Snapshot of a user's presence, as returned by `/checkin/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PresenceStatus {
    pub last_checkin_at: Option<DateTime<Utc>>,
    pub interval_days: u32,
    pub days_since_last_checkin: Option<u32>,
    pub overdue: bool,
}

/// Whole days elapsed from `t0` to `now`, truncated, clamped at zero.
///
/// Truncation is deliberate, not calendar-day counting: a day of silence
/// is charged only once a full 24 hours have elapsed, so crossing
/// midnight shortly after a check-in does not count against the user and
/// the overdue boundary lands exactly at `t0 + interval_days`.
///
/// Clock skew can make `now` precede `t0` (e.g. a check-in recorded by a
/// node with a fast clock); that counts as zero days, never a panic.
pub fn days_between(t0: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - t0).num_days();
    u32::try_from(days).unwrap_or(0)
}

/// The overdue predicate: elapsed days meet or exceed the interval.
///
/// `None` elapsed (never checked in) is never overdue — there is no anchor
/// to measure silence from.
pub fn is_overdue(days_since: Option<u32>, interval_days: u32) -> bool {
    match days_since {
        Some(days) => days >= interval_days,
        None => false,
    }
}
