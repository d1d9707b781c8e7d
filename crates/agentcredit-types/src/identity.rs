//! Identity types for AgentCredit
//!
//! All identity types are strongly typed wrappers around UUIDs to prevent
//! accidental mixing of different ID types. IDs are totally ordered so
//! that two-wallet operations can acquire locks in a deterministic order.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }
    };
}

// Core identity types
define_id_type!(WalletId, "wallet", "Unique identifier for an agent wallet");
define_id_type!(AgentId, "agent", "Unique identifier for an AI agent");

// Entity identity types
define_id_type!(LienId, "lien", "Unique identifier for a debt claim against a wallet");
define_id_type!(EscrowId, "escrow", "Unique identifier for an escrow reservation");
define_id_type!(TransferId, "tx", "Unique identifier for a transfer record");
define_id_type!(AgreementId, "royalty", "Unique identifier for a royalty agreement");
define_id_type!(BondId, "bond", "Unique identifier for a royalty-backed bond");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_id_creation() {
        let id = WalletId::new();
        let s = id.to_string();
        assert!(s.starts_with("wallet_"));
    }

    #[test]
    fn test_id_parsing() {
        let id = LienId::new();
        let s = id.to_string();
        let parsed = LienId::parse(&s).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_equality() {
        let uuid = Uuid::new_v4();
        let id1 = AgentId::from_uuid(uuid);
        let id2 = AgentId::from_uuid(uuid);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_id_ordering_is_total() {
        let a = WalletId::new();
        let b = WalletId::new();
        // Exactly one ordering holds for distinct ids
        assert_ne!(a, b);
        assert!((a < b) ^ (b < a));
    }
}
