//! # Validation Error Types
//!
//! Structured input-validation failures shared across the workspace.
//! Store- and transport-level errors live in their own crates; this is
//! only about the shape of values.

use thiserror::Error;

/// Errors from validating domain values at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Check-in interval must be at least one day.
    #[error("invalid check-in interval: {0} days (must be between 1 and {max})", max = crate::presence::MAX_INTERVAL_DAYS)]
    InvalidInterval(u32),

    /// A vault item must name at least one recipient.
    #[error("vault item must have at least one recipient")]
    EmptyRecipients,

    /// A referenced recipient does not exist under this owner.
    #[error("recipient {0} is not owned by this user")]
    ForeignRecipient(crate::identity::RecipientId),

    /// A required text field was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A monetary amount could not be parsed or was not positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A currency code was not a three-letter code.
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RecipientId;

    #[test]
    fn interval_error_names_bounds() {
        let msg = format!("{}", ValidationError::InvalidInterval(0));
        assert!(msg.contains("0 days"));
        assert!(msg.contains("730"));
    }

    #[test]
    fn foreign_recipient_names_id() {
        let id = RecipientId::new();
        let msg = format!("{}", ValidationError::ForeignRecipient(id));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn empty_field_names_field() {
        let err = ValidationError::EmptyField { field: "title" };
        assert!(format!("{err}").contains("title"));
    }
}
