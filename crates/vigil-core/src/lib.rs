//! # vigil-core — Foundational Types for Vigil
//!
//! This crate provides the building blocks shared by every other crate in
//! the workspace:
//!
//! - **Identifier newtypes** ([`identity`]): each domain identifier is a
//!   distinct type — you cannot pass a [`RecipientId`] where an [`ItemId`]
//!   is expected.
//! - **Clock abstraction** ([`time`]): all temporal logic takes an explicit
//!   [`Clock`], never ambient wall-clock reads, so overdue computation is
//!   deterministic under test.
//! - **Presence** ([`presence`]): the per-user check-in record and the pure
//!   overdue evaluator that both the status endpoint and the release sweep
//!   consult.
//! - **Validation errors** ([`error`]): structured input-validation failures.
//!
//! ## Crate Policy
//!
//! Sits at the bottom of the dependency DAG. No I/O, no async, no store
//! types — only values and pure functions.

pub mod error;
pub mod identity;
pub mod presence;
pub mod time;

// Re-export primary types.
pub use error::ValidationError;
pub use identity::{ItemId, ObligationId, RecipientId, RelationshipId, ReleaseId, UserId};
pub use presence::{days_between, is_overdue, PresenceRecord, PresenceStatus};
pub use time::{Clock, FixedClock, SystemClock};
