// SPDX-License-Identifier: AGPL-3.0-or-later
//! # vigil-release — The Dead-Man's-Switch Release Engine
//!
//! Orchestrates what happens when a user's silence exceeds their window:
//! claim the owner's release slot, decrypt their vault, deliver each
//! recipient's share, and record the outcome. The demo trigger and the
//! scheduled sweep run the identical path; the demo merely skips the
//! overdue check.
//!
//! ## Failure discipline
//!
//! Failures split into two classes:
//!
//! - **Fatal, pre-send** — the vault cannot be materialized (undecryptable
//!   envelope, missing owner account). The release moves to FAILED before
//!   any recipient hears anything; a later trigger may retry.
//! - **Per-recipient** — one send failing is recorded in that recipient's
//!   outcome and the loop continues. A release where every send failed is
//!   still COMPLETED: the engine's contract is "every recipient was
//!   attempted", not "every recipient was reached".

pub mod coordinator;
pub mod error;
pub mod simulate;

pub use coordinator::{ReleaseCoordinator, TriggerKind};
pub use error::ReleaseError;
pub use simulate::{SimulatedDelivery, SimulationReport};
