//! # Simulate Release (Dry Run)
//!
//! Answers "what would go out if the switch fired right now?" without
//! dispatching anything or touching the release log. Reuses the real
//! materialization path, so the dry run and a live release can never
//! disagree about grouping or decryptability.
//!
//! Only available once the user is actually overdue: previewing the
//! release of a live, checked-in vault is deliberately refused (the API
//! maps that refusal to 403).

use serde::Serialize;
use utoipa::ToSchema;

use vigil_core::{RecipientId, UserId};

use crate::coordinator::ReleaseCoordinator;
use crate::error::ReleaseError;

/// What one recipient would receive.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SimulatedDelivery {
    pub recipient_id: RecipientId,
    pub recipient_name: String,
    pub recipient_email: String,
    /// Titles only. The dry run decrypts to prove it can, then drops the
    /// content; titles are enough to show what is staged.
    pub item_titles: Vec<String>,
    pub messages_count: u32,
}

/// Full dry-run report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SimulationReport {
    pub days_overdue: u32,
    pub deliveries: Vec<SimulatedDelivery>,
    /// Items excluded because no recipient is assigned.
    pub unassigned_items: usize,
}

impl ReleaseCoordinator {
    /// Build a dry-run report for an overdue user. No dispatch, no state.
    pub fn simulate(&self, owner: UserId) -> Result<SimulationReport, ReleaseError> {
        let now = self.clock().now();
        let status = self.presence().status(owner, now)?;
        if !status.overdue {
            return Err(ReleaseError::NotOverdue {
                days_since: status.days_since_last_checkin,
                interval_days: status.interval_days,
            });
        }

        let bundle = self.vault().materialize_for_release(owner)?;
        let deliveries = bundle
            .into_iter()
            .map(|(recipient, items)| SimulatedDelivery {
                recipient_id: recipient.id,
                recipient_name: recipient.name,
                recipient_email: recipient.email,
                item_titles: items.iter().map(|i| i.title.clone()).collect(),
                messages_count: items.len() as u32,
            })
            .collect::<Vec<_>>();

        let items = self.vault().list_items(owner);
        let unassigned_items = items
            .iter()
            .filter(|i| i.recipient_ids.is_empty())
            .count();

        Ok(SimulationReport {
            days_overdue: status
                .days_since_last_checkin
                .map(|d| d.saturating_sub(status.interval_days))
                .unwrap_or(0),
            deliveries,
            unassigned_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;
    use vigil_core::{Clock, FixedClock};
    use vigil_crypto::VaultCipher;
    use vigil_notify::{Notifier, RecordingNotifier};
    use vigil_state::{ObligationStore, PresenceStore, ReleaseLog, UserStore, VaultStore};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn build(clock: Arc<FixedClock>) -> (ReleaseCoordinator, Arc<VaultStore>, Arc<PresenceStore>) {
        let users = Arc::new(UserStore::new());
        let presence = Arc::new(PresenceStore::new());
        let vault = Arc::new(VaultStore::new(Arc::new(VaultCipher::from_bytes([2; 32]))));
        let coordinator = ReleaseCoordinator::new(
            users,
            Arc::clone(&presence),
            Arc::clone(&vault),
            Arc::new(ObligationStore::new()),
            Arc::new(ReleaseLog::new()),
            Arc::new(RecordingNotifier::new()) as Arc<dyn Notifier>,
            clock as Arc<dyn Clock>,
        );
        (coordinator, vault, presence)
    }

    #[test]
    fn refuses_preview_while_user_is_current() {
        let clock = Arc::new(FixedClock::at(t0()));
        let (coordinator, _vault, presence) = build(clock);
        let owner = vigil_core::UserId::new();
        presence.record_checkin(owner, t0());

        assert!(matches!(
            coordinator.simulate(owner),
            Err(ReleaseError::NotOverdue { .. })
        ));
    }

    #[test]
    fn groups_titles_per_recipient_without_dispatch() {
        let clock = Arc::new(FixedClock::at(t0()));
        let (coordinator, vault, presence) = build(Arc::clone(&clock));
        let owner = vigil_core::UserId::new();
        presence.record_checkin(owner, t0());

        let ada = vault
            .add_recipient(owner, "ada", "ada@example.org", None, t0())
            .unwrap();
        vault
            .create_item(owner, "letter one", "a", vec![ada.id], t0())
            .unwrap();
        vault
            .create_item(
                owner,
                "letter two",
                "b",
                vec![ada.id],
                t0() + Duration::minutes(1),
            )
            .unwrap();
        // Orphan an item to exercise the unassigned count.
        let bob = vault
            .add_recipient(owner, "bob", "bob@example.org", None, t0())
            .unwrap();
        vault
            .create_item(owner, "orphaned", "c", vec![bob.id], t0())
            .unwrap();
        vault.delete_recipient(owner, bob.id).unwrap();

        clock.set(t0() + Duration::days(45));
        let report = coordinator.simulate(owner).unwrap();
        assert_eq!(report.days_overdue, 15);
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(
            report.deliveries[0].item_titles,
            vec!["letter one", "letter two"]
        );
        assert_eq!(report.unassigned_items, 1);
    }
}
