//! # Notification Message Types
//!
//! The wire shape of what a recipient receives when a release fires. The
//! message carries decrypted item content for the duration of the send
//! only; the release engine drops it immediately afterwards, and nothing
//! here is ever written to a store or a log.

use serde::Serialize;

use vigil_core::RecipientId;
use vigil_state::ReleasedItem;

/// One outstanding obligation line included in a release message, already
/// formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObligationLine {
    pub creditor_name: String,
    /// e.g. `"950.00 USD"`.
    pub amount: String,
    pub due_date: Option<String>,
}

/// Everything needed to deliver one recipient's share of a release.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseMessage {
    pub recipient_id: RecipientId,
    pub recipient_name: String,
    pub recipient_email: String,
    /// Email of the user whose vault is being released.
    pub owner_email: String,
    /// Decrypted items assigned to this recipient.
    pub items: Vec<ReleasedItem>,
    /// Outstanding obligations the owner wanted surfaced, if any.
    pub obligations: Vec<ObligationLine>,
    /// True when this release was a demo trigger.
    pub is_demo: bool,
}

impl ReleaseMessage {
    /// Number of legacy messages in this delivery.
    pub fn messages_count(&self) -> u32 {
        self.items.len() as u32
    }
}
