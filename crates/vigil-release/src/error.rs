//! # Release Engine Error Types

use thiserror::Error;

use vigil_state::StoreError;

/// Errors from release orchestration.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// A store operation failed. Includes the atomic-claim conflict
    /// (`StoreError::AlreadyInProgress`) and fatal vault decryption
    /// failures (`StoreError::Crypto`).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A non-demo trigger was requested for a user who is not overdue.
    #[error("user is not overdue: {days_since:?} of {interval_days} days elapsed")]
    NotOverdue {
        days_since: Option<u32>,
        interval_days: u32,
    },
}

impl ReleaseError {
    /// True when the error is the claim conflict.
    pub fn is_already_in_progress(&self) -> bool {
        matches!(self, Self::Store(StoreError::AlreadyInProgress))
    }
}
