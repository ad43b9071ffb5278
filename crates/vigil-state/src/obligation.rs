//! # Financial Obligations
//!
//! Outstanding debts a user wants surfaced to their recipients if the
//! switch fires. Amounts are stored in integer minor units with an ISO
//! currency code; parsing from decimal strings happens once, at the edge.
//!
//! Every mutation appends to a per-owner audit log with a JSON snapshot of
//! the obligation after the change (or before, for deletions).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vigil_core::{ObligationId, UserId, ValidationError};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A monetary amount in integer minor units plus an ISO 4217 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

impl Money {
    /// Parse a decimal string like `"1234.56"` with a currency code.
    ///
    /// At most two fraction digits; the amount must be strictly positive.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, ValidationError> {
        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(currency));
        }

        let amount = amount.trim();
        if amount.starts_with(['-', '+']) {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        let (whole, frac) = match amount.split_once('.') {
            Some((w, f)) => (w, f),
            None => (amount, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?
        };
        let frac_minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| {
                ValidationError::InvalidAmount(amount.to_string())
            })? * 10,
            _ => frac
                .parse()
                .map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?,
        };

        let amount_minor = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(frac_minor))
            .ok_or_else(|| ValidationError::InvalidAmount(amount.to_string()))?;
        if amount_minor <= 0 {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount_minor / 100,
            self.amount_minor % 100,
            self.currency
        )
    }
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Settlement state of an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationStatus {
    Outstanding,
    Settled,
}

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Updated,
    Settled,
    Deleted,
    Notified,
}

/// One append-only audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObligationAuditEntry {
    pub id: Uuid,
    pub obligation_id: ObligationId,
    pub action: AuditAction,
    /// JSON snapshot of the obligation after the change (before, for
    /// deletions).
    pub snapshot: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// A financial obligation as stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinancialObligation {
    pub id: ObligationId,
    pub owner_id: UserId,
    pub creditor_name: String,
    pub amount: Money,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: ObligationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Fields that may change on an update.
#[derive(Debug, Clone, Default)]
pub struct ObligationPatch {
    pub creditor_name: Option<String>,
    pub amount: Option<Money>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Per-currency outstanding totals plus counts, for `/api/obligations/summary`
/// and the release notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ObligationSummary {
    /// currency code → outstanding total in minor units.
    pub outstanding_by_currency: BTreeMap<String, i64>,
    pub outstanding_count: usize,
    pub settled_count: usize,
}

// ---------------------------------------------------------------------------
// Obligation Store
// ---------------------------------------------------------------------------

/// In-memory obligation store with its audit log.
pub struct ObligationStore {
    obligations: DashMap<UserId, BTreeMap<ObligationId, FinancialObligation>>,
    audit: DashMap<UserId, Vec<ObligationAuditEntry>>,
}

impl ObligationStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            obligations: DashMap::new(),
            audit: DashMap::new(),
        }
    }

    /// Record a new obligation.
    pub fn create(
        &self,
        owner: UserId,
        creditor_name: &str,
        amount: Money,
        description: Option<String>,
        due_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<FinancialObligation, StoreError> {
        if creditor_name.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "creditor_name",
            }
            .into());
        }
        let obligation = FinancialObligation {
            id: ObligationId::new(),
            owner_id: owner,
            creditor_name: creditor_name.trim().to_string(),
            amount,
            description,
            due_date,
            status: ObligationStatus::Outstanding,
            created_at: now,
            updated_at: now,
            settled_at: None,
        };
        self.obligations
            .entry(owner)
            .or_default()
            .insert(obligation.id, obligation.clone());
        self.append_audit(owner, &obligation, AuditAction::Created, now);
        Ok(obligation)
    }

    /// List obligations, optionally filtered by status.
    pub fn list(
        &self,
        owner: UserId,
        status: Option<ObligationStatus>,
    ) -> Vec<FinancialObligation> {
        self.obligations
            .get(&owner)
            .map(|m| {
                m.values()
                    .filter(|o| status.map_or(true, |s| o.status == s))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fetch one obligation.
    pub fn get(
        &self,
        owner: UserId,
        id: ObligationId,
    ) -> Result<FinancialObligation, StoreError> {
        self.obligations
            .get(&owner)
            .and_then(|m| m.get(&id).cloned())
            .ok_or(StoreError::NotFound("obligation"))
    }

    /// Apply a patch.
    pub fn update(
        &self,
        owner: UserId,
        id: ObligationId,
        patch: ObligationPatch,
        now: DateTime<Utc>,
    ) -> Result<FinancialObligation, StoreError> {
        let updated = {
            let mut entry = self
                .obligations
                .get_mut(&owner)
                .ok_or(StoreError::NotFound("obligation"))?;
            let obligation = entry.get_mut(&id).ok_or(StoreError::NotFound("obligation"))?;

            if let Some(name) = patch.creditor_name {
                if name.trim().is_empty() {
                    return Err(ValidationError::EmptyField {
                        field: "creditor_name",
                    }
                    .into());
                }
                obligation.creditor_name = name.trim().to_string();
            }
            if let Some(amount) = patch.amount {
                obligation.amount = amount;
            }
            if let Some(description) = patch.description {
                obligation.description = description;
            }
            if let Some(due_date) = patch.due_date {
                obligation.due_date = due_date;
            }
            obligation.updated_at = now;
            obligation.clone()
        };
        self.append_audit(owner, &updated, AuditAction::Updated, now);
        Ok(updated)
    }

    /// Mark an obligation settled. Settling twice is an error.
    pub fn settle(
        &self,
        owner: UserId,
        id: ObligationId,
        now: DateTime<Utc>,
    ) -> Result<FinancialObligation, StoreError> {
        let settled = {
            let mut entry = self
                .obligations
                .get_mut(&owner)
                .ok_or(StoreError::NotFound("obligation"))?;
            let obligation = entry.get_mut(&id).ok_or(StoreError::NotFound("obligation"))?;
            if obligation.status == ObligationStatus::Settled {
                return Err(StoreError::AlreadySettled);
            }
            obligation.status = ObligationStatus::Settled;
            obligation.settled_at = Some(now);
            obligation.updated_at = now;
            obligation.clone()
        };
        self.append_audit(owner, &settled, AuditAction::Settled, now);
        Ok(settled)
    }

    /// Delete an obligation, auditing its final state.
    pub fn delete(
        &self,
        owner: UserId,
        id: ObligationId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let removed = self
            .obligations
            .get_mut(&owner)
            .and_then(|mut m| m.remove(&id))
            .ok_or(StoreError::NotFound("obligation"))?;
        self.append_audit(owner, &removed, AuditAction::Deleted, now);
        Ok(())
    }

    /// Outstanding obligations, for the release notification.
    pub fn outstanding(&self, owner: UserId) -> Vec<FinancialObligation> {
        self.list(owner, Some(ObligationStatus::Outstanding))
    }

    /// Mark outstanding obligations as surfaced in a release notification.
    pub fn audit_notified(&self, owner: UserId, now: DateTime<Utc>) {
        for obligation in self.outstanding(owner) {
            self.append_audit(owner, &obligation, AuditAction::Notified, now);
        }
    }

    /// Per-currency totals and counts.
    pub fn summary(&self, owner: UserId) -> ObligationSummary {
        let all = self.list(owner, None);
        let mut outstanding_by_currency = BTreeMap::new();
        let mut outstanding_count = 0;
        let mut settled_count = 0;
        for obligation in &all {
            match obligation.status {
                ObligationStatus::Outstanding => {
                    outstanding_count += 1;
                    *outstanding_by_currency
                        .entry(obligation.amount.currency.clone())
                        .or_insert(0) += obligation.amount.amount_minor;
                }
                ObligationStatus::Settled => settled_count += 1,
            }
        }
        ObligationSummary {
            outstanding_by_currency,
            outstanding_count,
            settled_count,
        }
    }

    /// An owner's audit trail, oldest first.
    pub fn audit_log(&self, owner: UserId) -> Vec<ObligationAuditEntry> {
        self.audit
            .get(&owner)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot all obligations (persistence).
    pub fn snapshot(&self) -> Vec<FinancialObligation> {
        self.obligations
            .iter()
            .flat_map(|e| e.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Insert an obligation record directly (used for hydration from DB).
    pub fn insert_record(&self, obligation: FinancialObligation) {
        self.obligations
            .entry(obligation.owner_id)
            .or_default()
            .insert(obligation.id, obligation);
    }

    fn append_audit(
        &self,
        owner: UserId,
        obligation: &FinancialObligation,
        action: AuditAction,
        now: DateTime<Utc>,
    ) {
        let snapshot = serde_json::to_value(obligation).unwrap_or_default();
        self.audit.entry(owner).or_default().push(ObligationAuditEntry {
            id: Uuid::new_v4(),
            obligation_id: obligation.id,
            action,
            snapshot,
            at: now,
        });
    }
}

impl Default for ObligationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObligationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObligationStore")
            .field("owners_count", &self.obligations.len())
            .finish()
    }
}
