//! Lien record - an ordered debt claim against a wallet
//!
//! A lien reduces the debtor's available balance until it is settled (an
//! internal transfer to the creditor) or cancelled (deleted, never
//! settled). Liens are atomic: all-or-nothing, never partially settled.

use crate::{Amount, LienId, WalletId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending debt claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lien {
    /// Unique lien ID
    pub id: LienId,
    /// Wallet that owes
    pub debtor_wallet: WalletId,
    /// Wallet that is owed
    pub creditor_wallet: WalletId,
    /// Claim amount (always positive)
    pub amount: Amount,
    /// Settlement order: lower priority settles first
    pub priority: u32,
    /// Human-readable reason for the claim
    pub reason: String,
    /// When the lien was created
    pub created_at: DateTime<Utc>,
    /// Set exactly once, when the lien settles
    pub settled_at: Option<DateTime<Utc>>,
}

impl Lien {
    /// Create an unsettled lien
    pub fn new(
        debtor_wallet: WalletId,
        creditor_wallet: WalletId,
        amount: Amount,
        reason: impl Into<String>,
        priority: u32,
    ) -> Self {
        Self {
            id: LienId::new(),
            debtor_wallet,
            creditor_wallet,
            amount,
            priority,
            reason: reason.into(),
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Whether the lien has been settled
    pub fn is_settled(&self) -> bool {
        self.settled_at.is_some()
    }
}
