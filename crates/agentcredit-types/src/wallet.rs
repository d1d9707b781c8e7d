//! Wallet record for AgentCredit
//!
//! A wallet is the per-agent ledger head. `available` is a cached
//! projection of `balance - reserved - unsettled liens`; it is recomputed
//! inside the same critical section as any write to the inputs and must
//! never be treated as independent truth.

use crate::{AgentId, Amount, WalletId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A per-agent wallet
///
/// Wallets are created on first use and never deleted; a dead agent's
/// wallet simply goes inert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique wallet ID
    pub id: WalletId,
    /// Owning agent (unique across wallets)
    pub owner_agent_id: AgentId,
    /// Total funds, including reserved and liened portions
    pub balance: Amount,
    /// Funds carved out for in-flight escrows
    pub reserved: Amount,
    /// Cached projection: max(0, balance - reserved - unsettled liens)
    pub available: Amount,
    /// When the wallet was created
    pub created_at: DateTime<Utc>,
    /// When any field was last mutated
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet with zero balances for an agent
    pub fn new(owner_agent_id: AgentId) -> Self {
        let now = Utc::now();
        Self {
            id: WalletId::new(),
            owner_agent_id,
            balance: Amount::zero(),
            reserved: Amount::zero(),
            available: Amount::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the `available` projection from the given unsettled
    /// lien total. Must run after every mutation to `balance`,
    /// `reserved`, or any lien against this wallet.
    pub fn recalculate_available(&mut self, unsettled_liens: Amount) {
        let net = self
            .balance
            .minor_units()
            .saturating_sub(self.reserved.minor_units())
            .saturating_sub(unsettled_liens.minor_units());
        self.available = Amount::new(net.max(0));
        self.updated_at = Utc::now();
    }

    /// Balance net of reserved funds. This is what a lien settlement can
    /// draw on: the lien's own claim does not block its payoff.
    pub fn settleable_balance(&self) -> Amount {
        self.balance.saturating_sub(self.reserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wallet_is_empty() {
        let w = Wallet::new(AgentId::new());
        assert!(w.balance.is_zero());
        assert!(w.reserved.is_zero());
        assert!(w.available.is_zero());
    }

    #[test]
    fn test_recalculate_available() {
        let mut w = Wallet::new(AgentId::new());
        w.balance = Amount::new(100);
        w.reserved = Amount::new(40);

        w.recalculate_available(Amount::new(10));
        assert_eq!(w.available, Amount::new(50));
    }

    #[test]
    fn test_available_clamps_at_zero() {
        let mut w = Wallet::new(AgentId::new());
        w.balance = Amount::new(10);

        w.recalculate_available(Amount::new(50));
        assert_eq!(w.available, Amount::zero());
    }

    #[test]
    fn test_settleable_balance_ignores_liens() {
        let mut w = Wallet::new(AgentId::new());
        w.balance = Amount::new(40);
        w.reserved = Amount::new(15);
        assert_eq!(w.settleable_balance(), Amount::new(25));
    }
}
