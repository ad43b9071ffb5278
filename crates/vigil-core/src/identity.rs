//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout Vigil. Each
//! identifier wraps a UUID and is a distinct type, so owner/recipient/item
//! mixups are compile errors rather than data corruption.
//!
//! All identifiers here are UUID-based and therefore always valid by
//! construction; there is no fallible string parsing beyond `FromStr`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Helper macro implementing the shared surface of a UUID-backed identifier:
/// random construction, UUID conversion, `Display`, and `FromStr`.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $ty:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[schema(value_type = Uuid)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

uuid_id! {
    /// A unique identifier for a registered user (the vault owner).
    UserId
}

uuid_id! {
    /// A unique identifier for a trusted recipient of released vault items.
    RecipientId
}

uuid_id! {
    /// A unique identifier for an encrypted legacy vault item.
    ItemId
}

uuid_id! {
    /// A unique identifier for a financial obligation.
    ObligationId
}

uuid_id! {
    /// A unique identifier for a release attempt (one per trigger).
    ReleaseId
}

uuid_id! {
    /// A unique identifier for a relationship journal entry.
    RelationshipId
}
