//! AgentCredit Lien Manager - ordered debt claims against wallets
//!
//! A lien reduces the debtor's available balance from the moment it is
//! created until it settles or is cancelled. Settlement is atomic (a
//! lien is never paid in part) and auto-settlement on deposit walks the
//! debtor's liens as a strict priority queue: ascending priority, no
//! skipping ahead past an unaffordable claim.

use std::sync::Arc;

use tracing::{info, warn};

use agentcredit_store::LedgerStore;
use agentcredit_types::{
    Amount, CreditError, Lien, LienId, Result, Transfer, WalletId,
};

/// The Lien Manager service
#[derive(Clone)]
pub struct LienManager {
    store: Arc<LedgerStore>,
}

impl LienManager {
    /// Create a lien manager over a shared store
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Record a debt claim against a debtor wallet
    ///
    /// The debtor's `available` drops by `amount` immediately, in the
    /// same critical section as the insert.
    pub async fn create_lien(
        &self,
        debtor: &WalletId,
        creditor: &WalletId,
        amount: Amount,
        reason: &str,
        priority: u32,
    ) -> Result<Lien> {
        if !amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "lien",
                "amount must be positive",
            ));
        }
        if debtor == creditor {
            return Err(CreditError::invalid_input(
                "creditor_wallet",
                "a wallet cannot hold a lien against itself",
            ));
        }

        let _guard = self.store.lock_wallet(debtor).await;
        let lien = self
            .store
            .apply_lien_create(Lien::new(*debtor, *creditor, amount, reason, priority))
            .await?;
        info!(lien = %lien.id, %debtor, %creditor, %amount, priority, "lien created");
        Ok(lien)
    }

    /// Settle a lien in full
    ///
    /// Affordability is checked fresh at settlement time against the
    /// debtor's balance net of reserved funds - availability may have
    /// changed since the lien was created, and the lien's own claim is
    /// exactly what the payoff discharges.
    pub async fn settle_lien(&self, lien_id: &LienId) -> Result<(Lien, Transfer)> {
        let lien = self.store.lien(lien_id).await?;
        if lien.is_settled() {
            return Err(CreditError::LienAlreadySettled {
                lien_id: lien_id.to_string(),
            });
        }

        let _guards = self
            .store
            .lock_wallet_pair(&lien.debtor_wallet, &lien.creditor_wallet)
            .await;
        let (lien, transfer) = self.store.apply_lien_settlement(lien_id).await?;
        info!(lien = %lien_id, amount = %lien.amount, "lien settled");
        Ok((lien, transfer))
    }

    /// Delete an unsettled lien without payment
    pub async fn cancel_lien(&self, lien_id: &LienId) -> Result<Lien> {
        let lien = self.store.lien(lien_id).await?;

        let _guard = self.store.lock_wallet(&lien.debtor_wallet).await;
        let removed = self.store.apply_lien_cancel(lien_id).await?;
        info!(lien = %lien_id, "lien cancelled");
        Ok(removed)
    }

    /// Settle a wallet's liens after a deposit, in strict priority order
    ///
    /// Walks unsettled liens ascending by priority (then creation time),
    /// settling each while the debtor can afford it, and stops at the
    /// first claim it cannot pay - later, cheaper liens are never
    /// settled ahead of an earlier one. Returns the settlement
    /// transfers, in order.
    ///
    /// Callers that need deposit/settlement sequences serialized per
    /// wallet (the Enforcement Orchestrator does) hold the store's
    /// deposit gate across the deposit and this walk.
    pub async fn auto_settle_on_deposit(&self, wallet_id: &WalletId) -> Result<Vec<Transfer>> {
        let queue = self.store.unsettled_liens_for(wallet_id).await;
        let mut settled = Vec::new();

        for lien in queue {
            match self.settle_lien(&lien.id).await {
                Ok((_, transfer)) => settled.push(transfer),
                Err(CreditError::InsufficientFunds { .. }) => {
                    // Strict priority queue: nothing past this point settles
                    break;
                }
                Err(CreditError::LienAlreadySettled { .. }) => {
                    // Raced with a direct settlement; the claim is gone
                    continue;
                }
                Err(e) => {
                    warn!(lien = %lien.id, error = %e, "auto-settlement aborted");
                    return Err(e);
                }
            }
        }

        if !settled.is_empty() {
            info!(wallet = %wallet_id, count = settled.len(), "liens auto-settled on deposit");
        }
        Ok(settled)
    }

    /// Fetch a lien snapshot
    pub async fn lien(&self, lien_id: &LienId) -> Result<Lien> {
        self.store.lien(lien_id).await
    }

    /// Unsettled liens against a debtor, in settlement order
    pub async fn liens_against(&self, debtor: &WalletId) -> Vec<Lien> {
        self.store.unsettled_liens_for(debtor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcredit_types::{AgentId, Wallet};

    async fn wallet_with(store: &Arc<LedgerStore>, amount: i128) -> WalletId {
        let wallet = store.insert_wallet(Wallet::new(AgentId::new())).await.unwrap();
        if amount > 0 {
            store
                .apply_deposit(&wallet.id, Amount::new(amount), "seed")
                .await
                .unwrap();
        }
        wallet.id
    }

    #[tokio::test]
    async fn self_lien_is_rejected() {
        let store = Arc::new(LedgerStore::new());
        let manager = LienManager::new(store.clone());
        let debtor = wallet_with(&store, 100).await;

        let err = manager
            .create_lien(&debtor, &debtor, Amount::new(10), "self", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn lien_against_missing_wallet_fails() {
        let store = Arc::new(LedgerStore::new());
        let manager = LienManager::new(store.clone());
        let debtor = wallet_with(&store, 100).await;

        let err = manager
            .create_lien(&debtor, &WalletId::new(), Amount::new(10), "ghost", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::WalletNotFound { .. }));
    }

    #[tokio::test]
    async fn settlement_requires_fresh_affordability() {
        let store = Arc::new(LedgerStore::new());
        let manager = LienManager::new(store.clone());
        let debtor = wallet_with(&store, 100).await;
        let creditor = wallet_with(&store, 0).await;

        let lien = manager
            .create_lien(&debtor, &creditor, Amount::new(30), "cost", 1)
            .await
            .unwrap();

        // Drain the debtor below the claim before settling
        store.apply_reserve_delta(&debtor, 90).await.unwrap();
        let err = manager.settle_lien(&lien.id).await.unwrap_err();
        assert!(matches!(err, CreditError::InsufficientFunds { .. }));

        // Free the funds again and the same lien settles
        store.apply_reserve_delta(&debtor, -90).await.unwrap();
        let (settled, _) = manager.settle_lien(&lien.id).await.unwrap();
        assert!(settled.is_settled());
    }

    #[tokio::test]
    async fn auto_settle_walks_priorities_in_order() {
        let store = Arc::new(LedgerStore::new());
        let manager = LienManager::new(store.clone());
        let debtor = wallet_with(&store, 0).await;
        let creditor = wallet_with(&store, 0).await;

        // Priorities 1, 2, 3 of 30 each; fund enough for the first two
        let l1 = manager.create_lien(&debtor, &creditor, Amount::new(30), "first", 1).await.unwrap();
        let l3 = manager.create_lien(&debtor, &creditor, Amount::new(30), "third", 3).await.unwrap();
        let l2 = manager.create_lien(&debtor, &creditor, Amount::new(30), "second", 2).await.unwrap();

        store.apply_deposit(&debtor, Amount::new(70), "deposit").await.unwrap();
        let settled = manager.auto_settle_on_deposit(&debtor).await.unwrap();

        assert_eq!(settled.len(), 2);
        assert_eq!(settled[0].memo, "lien settlement: first");
        assert_eq!(settled[1].memo, "lien settlement: second");
        assert!(manager.lien(&l1.id).await.unwrap().is_settled());
        assert!(manager.lien(&l2.id).await.unwrap().is_settled());
        assert!(!manager.lien(&l3.id).await.unwrap().is_settled());
    }

    #[tokio::test]
    async fn auto_settle_never_skips_an_unaffordable_lien() {
        let store = Arc::new(LedgerStore::new());
        let manager = LienManager::new(store.clone());
        let debtor = wallet_with(&store, 0).await;
        let creditor = wallet_with(&store, 0).await;

        // Priority 1 costs 50, priority 2 costs 10; a 40 deposit can
        // afford the second but must not reach past the first.
        manager.create_lien(&debtor, &creditor, Amount::new(50), "big", 1).await.unwrap();
        let small = manager.create_lien(&debtor, &creditor, Amount::new(10), "small", 2).await.unwrap();

        store.apply_deposit(&debtor, Amount::new(40), "deposit").await.unwrap();
        let settled = manager.auto_settle_on_deposit(&debtor).await.unwrap();

        assert!(settled.is_empty());
        assert!(!manager.lien(&small.id).await.unwrap().is_settled());
    }

    #[tokio::test]
    async fn cancelled_lien_restores_available_without_payment() {
        let store = Arc::new(LedgerStore::new());
        let manager = LienManager::new(store.clone());
        let debtor = wallet_with(&store, 100).await;
        let creditor = wallet_with(&store, 0).await;

        let lien = manager
            .create_lien(&debtor, &creditor, Amount::new(30), "cost", 1)
            .await
            .unwrap();
        assert_eq!(store.wallet(&debtor).await.unwrap().available, Amount::new(70));

        manager.cancel_lien(&lien.id).await.unwrap();
        assert_eq!(store.wallet(&debtor).await.unwrap().available, Amount::new(100));
        assert_eq!(store.wallet(&creditor).await.unwrap().balance, Amount::zero());
        assert!(matches!(
            manager.lien(&lien.id).await.unwrap_err(),
            CreditError::LienNotFound { .. }
        ));
    }
}
