// SPDX-License-Identifier: AGPL-3.0-or-later
//! # Release Coordinator
//!
//! One entry point for every way a release can start. The coordinator
//! owns no state of its own: it composes the stores and the notifier, and
//! the ReleaseLog's atomic claim is what makes a trigger one-shot.

use std::sync::Arc;

use vigil_core::{Clock, PresenceStatus, UserId};
use vigil_notify::{Notifier, ObligationLine, ReleaseMessage};
use vigil_state::{
    ObligationStore, OutcomeStatus, PresenceStore, RecipientOutcome, ReleaseLog, ReleaseRecord,
    UserStore, VaultStore,
};

use crate::error::ReleaseError;

/// How a release was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Scheduled sweep or manual trigger: requires the user to be overdue.
    Overdue,
    /// Demo trigger: runs the full pipeline against a live notifier but
    /// skips the overdue check.
    Demo,
}

/// Orchestrates releases over the shared stores.
pub struct ReleaseCoordinator {
    users: Arc<UserStore>,
    presence: Arc<PresenceStore>,
    vault: Arc<VaultStore>,
    obligations: Arc<ObligationStore>,
    releases: Arc<ReleaseLog>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ReleaseCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<UserStore>,
        presence: Arc<PresenceStore>,
        vault: Arc<VaultStore>,
        obligations: Arc<ObligationStore>,
        releases: Arc<ReleaseLog>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            presence,
            vault,
            obligations,
            releases,
            notifier,
            clock,
        }
    }

    /// The release log this coordinator writes to.
    pub fn releases(&self) -> &Arc<ReleaseLog> {
        &self.releases
    }

    /// Record a check-in: resets the user's silence window and clears any
    /// PENDING claim (re-arms the switch). An IN_PROGRESS release is never
    /// cancelled.
    pub fn record_checkin(&self, owner: UserId) -> PresenceStatus {
        let now = self.clock.now();
        let status = self.presence.record_checkin(owner, now);
        let cleared = self.releases.clear_pending(owner);
        if cleared > 0 {
            tracing::info!(user = %owner, cleared, "check-in cleared pending release claim");
        }
        status
    }

    /// Run one release for `owner`, end to end.
    ///
    /// Returns the terminal [`ReleaseRecord`] on COMPLETED; fatal pre-send
    /// failures surface as an error after the record moves to FAILED.
    pub async fn trigger(
        &self,
        owner: UserId,
        kind: TriggerKind,
    ) -> Result<ReleaseRecord, ReleaseError> {
        let now = self.clock.now();
        let status = self.presence.status(owner, now)?;

        if kind == TriggerKind::Overdue && !status.overdue {
            return Err(ReleaseError::NotOverdue {
                days_since: status.days_since_last_checkin,
                interval_days: status.interval_days,
            });
        }

        let days_overdue = status
            .days_since_last_checkin
            .map(|d| d.saturating_sub(status.interval_days))
            .unwrap_or(0);
        let is_demo = kind == TriggerKind::Demo;

        // The single serialization point: of two concurrent triggers,
        // exactly one passes this line.
        let release_id = self.releases.claim(owner, now, days_overdue, is_demo)?;
        self.releases.begin(owner, release_id, now)?;
        tracing::info!(user = %owner, release = %release_id, days_overdue, is_demo, "release claimed");

        // Materialize everything before the first send. Any failure here
        // is fatal: no recipient has heard anything yet.
        let bundle = match self.vault.materialize_for_release(owner) {
            Ok(bundle) => bundle,
            Err(err) => {
                tracing::error!(user = %owner, release = %release_id, "vault materialization failed");
                self.releases
                    .fail(owner, release_id, &err.to_string(), self.clock.now())?;
                return Err(err.into());
            }
        };
        let owner_email = match self.users.get(owner) {
            Ok(user) => user.email,
            Err(err) => {
                self.releases
                    .fail(owner, release_id, &err.to_string(), self.clock.now())?;
                return Err(err.into());
            }
        };
        let obligations = self.obligation_lines(owner);

        // Per-recipient delivery. Failures are recorded, never propagated:
        // one unreachable inbox must not block the others.
        let mut outcomes = Vec::with_capacity(bundle.len());
        let mut any_sent = false;
        for (recipient, items) in bundle {
            let message = ReleaseMessage {
                recipient_id: recipient.id,
                recipient_name: recipient.name.clone(),
                recipient_email: recipient.email.clone(),
                owner_email: owner_email.clone(),
                items,
                obligations: obligations.clone(),
                is_demo,
            };
            let messages_count = message.messages_count();
            let outcome = match self.notifier.send_release(&message).await {
                Ok(()) => {
                    any_sent = true;
                    RecipientOutcome {
                        recipient_id: recipient.id,
                        recipient_email: recipient.email,
                        status: OutcomeStatus::Sent,
                        error: None,
                        messages_count,
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        user = %owner,
                        release = %release_id,
                        recipient = %recipient.id,
                        error = %err,
                        "release send failed"
                    );
                    RecipientOutcome {
                        recipient_id: recipient.id,
                        recipient_email: recipient.email,
                        status: OutcomeStatus::Failed,
                        error: Some(err.to_string()),
                        messages_count,
                    }
                }
            };
            outcomes.push(outcome);
        }
        // Dropped here: decrypted content does not outlive the send loop.

        if any_sent {
            self.obligations.audit_notified(owner, self.clock.now());
        }

        let record = self
            .releases
            .complete(owner, release_id, outcomes, self.clock.now())?;
        tracing::info!(
            user = %owner,
            release = %release_id,
            recipients = record.outcomes.len(),
            sent = record.outcomes.iter().filter(|o| o.status == OutcomeStatus::Sent).count(),
            "release completed"
        );
        Ok(record)
    }

    /// Evaluate every user and trigger a release for each one overdue.
    ///
    /// Claim conflicts (a release already running) and per-user fatal
    /// failures are logged and skipped; the sweep itself never fails.
    pub async fn sweep(&self) -> Vec<ReleaseRecord> {
        let now = self.clock.now();
        let mut completed = Vec::new();
        for record in self.presence.snapshot() {
            if !record.status_at(now).overdue {
                continue;
            }
            match self.trigger(record.user_id, TriggerKind::Overdue).await {
                Ok(release) => completed.push(release),
                Err(err) if err.is_already_in_progress() => {
                    tracing::debug!(user = %record.user_id, "sweep skipped: release already active");
                }
                Err(err) => {
                    tracing::error!(user = %record.user_id, error = %err, "sweep release failed");
                }
            }
        }
        completed
    }

    /// Format the owner's outstanding obligations for inclusion in a
    /// release message.
    fn obligation_lines(&self, owner: UserId) -> Vec<ObligationLine> {
        self.obligations
            .outstanding(owner)
            .into_iter()
            .map(|o| ObligationLine {
                creditor_name: o.creditor_name,
                amount: o.amount.to_string(),
                due_date: o.due_date.map(|d| d.to_string()),
            })
            .collect()
    }

    pub(crate) fn presence(&self) -> &Arc<PresenceStore> {
        &self.presence
    }

    pub(crate) fn vault(&self) -> &Arc<VaultStore> {
        &self.vault
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for ReleaseCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseCoordinator")
            .field("notifier", &self.notifier.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use vigil_core::FixedClock;
    use vigil_crypto::VaultCipher;
    use vigil_notify::RecordingNotifier;
    use vigil_state::{Money, ReleaseStatus, StoreError};

    struct Harness {
        coordinator: ReleaseCoordinator,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<FixedClock>,
        users: Arc<UserStore>,
        presence: Arc<PresenceStore>,
        vault: Arc<VaultStore>,
        obligations: Arc<ObligationStore>,
        releases: Arc<ReleaseLog>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn harness() -> Harness {
        let users = Arc::new(UserStore::new());
        let presence = Arc::new(PresenceStore::new());
        let vault = Arc::new(VaultStore::new(Arc::new(VaultCipher::from_bytes([1; 32]))));
        let obligations = Arc::new(ObligationStore::new());
        let releases = Arc::new(ReleaseLog::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(FixedClock::at(t0()));
        let coordinator = ReleaseCoordinator::new(
            Arc::clone(&users),
            Arc::clone(&presence),
            Arc::clone(&vault),
            Arc::clone(&obligations),
            Arc::clone(&releases),
            notifier.clone() as Arc<dyn Notifier>,
            clock.clone() as Arc<dyn Clock>,
        );
        Harness {
            coordinator,
            notifier,
            clock,
            users,
            presence,
            vault,
            obligations,
            releases,
        }
    }

    /// Register a user with one checked-in presence record and `n` named
    /// recipients each assigned one item.
    fn seed_user(h: &Harness, recipient_names: &[&str]) -> UserId {
        let user = h
            .users
            .register(
                &format!("owner-{}@example.org", uuid::Uuid::new_v4().simple()),
                "phc".into(),
                t0(),
            )
            .unwrap();
        h.presence.record_checkin(user.id, t0());
        for name in recipient_names {
            let r = h
                .vault
                .add_recipient(user.id, name, &format!("{name}@example.org"), None, t0())
                .unwrap();
            h.vault
                .create_item(user.id, &format!("for {name}"), "goodbye", vec![r.id], t0())
                .unwrap();
        }
        user.id
    }

    #[tokio::test]
    async fn demo_trigger_runs_full_lifecycle_without_overdue() {
        let h = harness();
        let owner = seed_user(&h, &["ada", "bob"]);

        let record = h.coordinator.trigger(owner, TriggerKind::Demo).await.unwrap();
        assert_eq!(record.status, ReleaseStatus::Completed);
        assert!(record.is_demo);
        assert_eq!(record.outcomes.len(), 2);
        assert!(record
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Sent && o.messages_count == 1));
        assert_eq!(h.notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn overdue_trigger_rejects_fresh_user() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);

        let err = h
            .coordinator
            .trigger(owner, TriggerKind::Overdue)
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::NotOverdue { .. }));
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn middle_recipient_failure_still_completes() {
        let h = harness();
        let owner = seed_user(&h, &["ada", "bob", "carol"]);
        h.notifier.fail_for("bob@example.org");

        let record = h.coordinator.trigger(owner, TriggerKind::Demo).await.unwrap();
        assert_eq!(record.status, ReleaseStatus::Completed);
        assert_eq!(record.outcomes.len(), 3);

        let failed: Vec<_> = record
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].recipient_email, "bob@example.org");
        assert!(failed[0].error.as_deref().unwrap().contains("delivery failure"));
        assert_eq!(h.notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn second_trigger_conflicts_while_first_is_active() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);

        // Hold the slot the way an in-flight release would.
        let id = h.releases.claim(owner, t0(), 0, true).unwrap();
        h.releases.begin(owner, id, t0()).unwrap();

        let err = h
            .coordinator
            .trigger(owner, TriggerKind::Demo)
            .await
            .unwrap_err();
        assert!(err.is_already_in_progress());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn decryption_failure_is_fatal_before_any_send() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);

        // A row sealed under the wrong key makes the batch undecryptable.
        let alien = VaultCipher::from_bytes([9; 32])
            .encrypt(owner, b"???")
            .unwrap();
        let mut bad = h.vault.snapshot_items()[0].clone();
        bad.id = vigil_core::ItemId::new();
        bad.encrypted_content = alien;
        h.vault.insert_item_record(bad);

        let err = h
            .coordinator
            .trigger(owner, TriggerKind::Demo)
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Store(StoreError::Crypto(_))));
        assert!(h.notifier.sent().is_empty());

        let records = h.releases.list(owner);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReleaseStatus::Failed);
        assert!(records[0].error.as_deref().unwrap().contains("decryption"));

        // FAILED is retryable once the vault is repaired.
        assert!(h.releases.claim(owner, t0(), 0, true).is_ok());
    }

    #[tokio::test]
    async fn sweep_boundary_is_exact_at_interval() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);

        h.clock.set(t0() + Duration::days(29));
        assert!(h.coordinator.sweep().await.is_empty());

        h.clock.set(t0() + Duration::days(30));
        let completed = h.coordinator.sweep().await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].owner_id, owner);
        assert_eq!(completed[0].days_overdue, 0);
        assert!(!completed[0].is_demo);
    }

    #[tokio::test]
    async fn sweep_skips_users_who_never_checked_in() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);
        let ghost = h
            .users
            .register("ghost@example.org", "phc".into(), t0())
            .unwrap();
        h.presence.ensure(ghost.id, t0());

        h.clock.set(t0() + Duration::days(365));
        let completed = h.coordinator.sweep().await;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].owner_id, owner);
    }

    #[tokio::test]
    async fn sweep_does_not_fire_twice_for_one_silence() {
        let h = harness();
        seed_user(&h, &["ada"]);

        h.clock.set(t0() + Duration::days(31));
        assert_eq!(h.coordinator.sweep().await.len(), 1);
        // A completed release frees the slot, so a second sweep fires again
        // for the same continuing silence: the release log keeps both.
        assert_eq!(h.coordinator.sweep().await.len(), 1);
    }

    #[tokio::test]
    async fn checkin_clears_pending_claim_and_rearms() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);

        h.releases.claim(owner, t0(), 0, false).unwrap();
        let status = h.coordinator.record_checkin(owner);
        assert_eq!(status.days_since_last_checkin, Some(0));
        assert!(h.releases.list(owner).is_empty());
        assert!(h.releases.claim(owner, t0(), 0, false).is_ok());
    }

    #[tokio::test]
    async fn outstanding_obligations_ride_along_and_get_audited() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);
        h.obligations
            .create(
                owner,
                "City Utilities",
                Money::parse("89.10", "USD").unwrap(),
                None,
                None,
                t0(),
            )
            .unwrap();

        h.coordinator.trigger(owner, TriggerKind::Demo).await.unwrap();

        let sent = h.notifier.sent();
        assert_eq!(sent[0].obligations.len(), 1);
        assert_eq!(sent[0].obligations[0].amount, "89.10 USD");

        let audited = h
            .obligations
            .audit_log(owner)
            .iter()
            .filter(|e| e.action == vigil_state::AuditAction::Notified)
            .count();
        assert_eq!(audited, 1);
    }

    #[tokio::test]
    async fn recipient_without_items_is_not_contacted() {
        let h = harness();
        let owner = seed_user(&h, &["ada"]);
        h.vault
            .add_recipient(owner, "silent", "silent@example.org", None, t0())
            .unwrap();

        let record = h.coordinator.trigger(owner, TriggerKind::Demo).await.unwrap();
        assert_eq!(record.outcomes.len(), 1);
        assert_eq!(record.outcomes[0].recipient_email, "ada@example.org");
    }
}
