//! Escrow record - funds carved out of available balance
//!
//! Lifecycle: locked -> released (full, to a recipient) | partially
//! released (amount decreases, escrow persists) | cancelled (funds
//! return to available, no recipient). Terminal once `released_at` is
//! set, and the amount is monotonically non-increasing after locking.

use crate::{Amount, EscrowId, WalletId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reservation of funds for in-flight work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    /// Unique escrow ID
    pub id: EscrowId,
    /// Wallet whose funds are reserved
    pub wallet: WalletId,
    /// Remaining reserved amount (decreases on partial release)
    pub amount: Amount,
    /// What the reservation is for (e.g. a job id)
    pub purpose: String,
    /// Human-readable release condition
    pub release_condition: String,
    /// When the funds were locked
    pub locked_at: DateTime<Utc>,
    /// Set exactly once, when the escrow reaches a terminal state
    pub released_at: Option<DateTime<Utc>>,
}

impl Escrow {
    /// Create a locked escrow
    pub fn new(
        wallet: WalletId,
        amount: Amount,
        purpose: impl Into<String>,
        release_condition: impl Into<String>,
    ) -> Self {
        Self {
            id: EscrowId::new(),
            wallet,
            amount,
            purpose: purpose.into(),
            release_condition: release_condition.into(),
            locked_at: Utc::now(),
            released_at: None,
        }
    }

    /// Whether the escrow has reached a terminal state
    pub fn is_released(&self) -> bool {
        self.released_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_escrow_is_locked() {
        let escrow = Escrow::new(WalletId::new(), Amount::new(40), "job-1", "on completion");
        assert!(!escrow.is_released());
        assert_eq!(escrow.amount, Amount::new(40));
        assert_eq!(escrow.purpose, "job-1");
    }
}
