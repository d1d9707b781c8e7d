//! AgentCredit Types - Canonical domain types for the agent credit layer
//!
//! This crate contains all foundational types for AgentCredit with zero
//! dependencies on other agentcredit crates. It defines:
//!
//! - Identity types (WalletId, AgentId, LienId, EscrowId, ...)
//! - Exact minor-unit `Amount` arithmetic (i128, checked, no floats)
//! - Wallet, Lien, Escrow, Transfer, RoyaltyAgreement and Bond records
//! - The closed `CreditError` taxonomy
//!
//! # Architectural Invariants
//!
//! These types support the core credit-layer invariants:
//!
//! 1. `available = max(0, balance - reserved - unsettled liens)` is a
//!    derived projection, never independent truth
//! 2. Every balance movement leaves an immutable `Transfer` record
//! 3. Liens are atomic - settled in full or not at all
//! 4. Escrow amounts are monotonically non-increasing once locked
//! 5. Failure is explicit - every error is a typed variant

pub mod identity;
pub mod amount;
pub mod wallet;
pub mod lien;
pub mod escrow;
pub mod transfer;
pub mod royalty;
pub mod bond;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use wallet::*;
pub use lien::*;
pub use escrow::*;
pub use transfer::*;
pub use royalty::*;
pub use bond::*;
pub use error::*;

/// Version of the AgentCredit types schema
pub const TYPES_VERSION: &str = "0.1.0";
