//! # vigil-state — Domain Stores for Vigil
//!
//! Thread-safe in-memory stores backing the HTTP layer and the release
//! engine. Each store is a `DashMap` keyed by owner, so requests from
//! different users never contend; state transitions that must be atomic
//! (the release claim, obligation settlement) run under a single entry
//! lock, never read-then-write.
//!
//! Stores here are the runtime source of truth. The API crate's `db`
//! module persists snapshots to Postgres and hydrates these maps on
//! startup; that path uses the `insert_record` constructors on each store.
//!
//! ## Stores
//!
//! - [`PresenceStore`] — per-user check-in anchors and intervals.
//! - [`VaultStore`] — recipients, encrypted items, and the only plaintext
//!   egress path ([`VaultStore::materialize_for_release`]).
//! - [`ObligationStore`] — financial obligations with an append-only audit
//!   log.
//! - [`TrustedContactStore`] — the 0..1 designated contact per user, with
//!   email verification tokens.
//! - [`RelationshipStore`] — the relationship journal.
//! - [`UserStore`] — registered accounts.
//! - [`ReleaseLog`] — release attempt records and the atomic per-owner
//!   claim that serializes triggers.

pub mod error;
pub mod obligation;
pub mod presence;
pub mod relationship;
pub mod release;
pub mod trusted;
pub mod user;
pub mod vault;

// Re-export primary types.
pub use error::StoreError;
pub use obligation::{
    AuditAction, FinancialObligation, Money, ObligationAuditEntry, ObligationPatch,
    ObligationStatus, ObligationStore, ObligationSummary,
};
pub use presence::PresenceStore;
pub use relationship::{Relationship, RelationshipPatch, RelationshipState, RelationshipStore};
pub use release::{
    OutcomeStatus, RecipientOutcome, ReleaseLog, ReleaseRecord, ReleaseStatus,
};
pub use trusted::{TrustedContact, TrustedContactPatch, TrustedContactStore, VerificationStatus};
pub use user::{User, UserStore};
pub use vault::{
    ItemPatch, ItemSummary, Recipient, RecipientPatch, ReleasedItem, VaultItem, VaultStore,
};
