//! Transfer record - the immutable audit journal of balance movements
//!
//! Every deposit, settlement, royalty split and escrow release leaves
//! exactly one Transfer. `from_wallet` is absent for external deposits;
//! internal transfers always name both sides and net to zero across the
//! system.

use crate::{Amount, TransferId, WalletId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a balance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    /// Plain wallet-to-wallet movement (or external deposit)
    Direct,
    /// Payoff of a lien
    LienSettlement,
    /// Automatic royalty split
    Royalty,
    /// Funds leaving an escrow toward a recipient
    EscrowRelease,
}

/// An immutable record of a single balance movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique transfer ID
    pub id: TransferId,
    /// Debited wallet; `None` for external deposits
    pub from_wallet: Option<WalletId>,
    /// Credited wallet
    pub to_wallet: WalletId,
    /// Amount moved (always positive)
    pub amount: Amount,
    /// Free-form memo
    pub memo: String,
    /// Movement classification
    pub kind: TransferKind,
    /// When the movement was committed
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    /// Record an external deposit (no source wallet)
    pub fn deposit(to_wallet: WalletId, amount: Amount, memo: impl Into<String>) -> Self {
        Self {
            id: TransferId::new(),
            from_wallet: None,
            to_wallet,
            amount,
            memo: memo.into(),
            kind: TransferKind::Direct,
            created_at: Utc::now(),
        }
    }

    /// Record an internal movement between two wallets
    pub fn internal(
        from_wallet: WalletId,
        to_wallet: WalletId,
        amount: Amount,
        memo: impl Into<String>,
        kind: TransferKind,
    ) -> Self {
        Self {
            id: TransferId::new(),
            from_wallet: Some(from_wallet),
            to_wallet,
            amount,
            memo: memo.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Whether this transfer injected new funds into the system
    pub fn is_deposit(&self) -> bool {
        self.from_wallet.is_none()
    }
}
