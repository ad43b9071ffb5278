//! Route modules, one per REST prefix.

use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod checkin;
pub mod demo;
pub mod legacy;
pub mod obligations;
pub mod relationships;
pub mod trusted_person;

/// Deserializer for nullable patch fields.
///
/// Distinguishes an absent field (leave unchanged, outer `None`) from an
/// explicit `null` (clear the value, `Some(None)`). Pair with
/// `#[serde(default)]` on the field.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
