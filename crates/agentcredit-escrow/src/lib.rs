//! AgentCredit Escrow Manager - locked funds with conditional release
//!
//! Locking moves funds from `available` into `reserved` on the source
//! wallet; the balance does not move until release. A release pays the
//! recipient out of the reserved portion, a partial release leaves the
//! escrow active with the remainder, and a cancel returns the remainder
//! to `available` without any payment.

use std::sync::Arc;

use tracing::info;

use agentcredit_store::LedgerStore;
use agentcredit_types::{
    Amount, CreditError, Escrow, EscrowId, Result, Transfer, WalletId,
};

/// The Escrow Manager service
#[derive(Clone)]
pub struct EscrowManager {
    store: Arc<LedgerStore>,
}

impl EscrowManager {
    /// Create an escrow manager over a shared store
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Lock funds out of a wallet's available balance
    pub async fn lock_funds(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
        purpose: &str,
        release_condition: &str,
    ) -> Result<Escrow> {
        if !amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "escrow",
                "amount must be positive",
            ));
        }

        let _guard = self.store.lock_wallet(wallet_id).await;
        let escrow = self
            .store
            .apply_escrow_lock(wallet_id, amount, purpose, release_condition)
            .await?;
        info!(escrow = %escrow.id, wallet = %wallet_id, %amount, purpose, "escrow locked");
        Ok(escrow)
    }

    /// Release the full remaining escrow amount to a recipient
    pub async fn release_funds(&self, escrow_id: &EscrowId, to: &WalletId) -> Result<(Escrow, Transfer)> {
        let escrow = self.store.escrow(escrow_id).await?;
        self.release_amount(escrow_id, &escrow.wallet, to, escrow.amount)
            .await
    }

    /// Release part of an escrow; the remainder stays locked
    pub async fn partial_release(
        &self,
        escrow_id: &EscrowId,
        to: &WalletId,
        amount: Amount,
    ) -> Result<(Escrow, Transfer)> {
        if !amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "release",
                "amount must be positive",
            ));
        }
        let escrow = self.store.escrow(escrow_id).await?;
        self.release_amount(escrow_id, &escrow.wallet, to, amount)
            .await
    }

    async fn release_amount(
        &self,
        escrow_id: &EscrowId,
        source: &WalletId,
        to: &WalletId,
        amount: Amount,
    ) -> Result<(Escrow, Transfer)> {
        let _guards = self.store.lock_wallet_pair(source, to).await;
        let (escrow, transfer) = self
            .store
            .apply_escrow_release(escrow_id, to, amount)
            .await?;
        info!(
            escrow = %escrow_id,
            %to,
            %amount,
            remaining = %escrow.amount,
            "escrow released"
        );
        Ok((escrow, transfer))
    }

    /// Cancel an escrow and return the remaining funds to available
    ///
    /// No transfer is journaled; the balance never moved.
    pub async fn cancel_escrow(&self, escrow_id: &EscrowId) -> Result<Escrow> {
        let escrow = self.store.escrow(escrow_id).await?;

        let _guard = self.store.lock_wallet(&escrow.wallet).await;
        let cancelled = self.store.apply_escrow_cancel(escrow_id).await?;
        info!(escrow = %escrow_id, wallet = %cancelled.wallet, "escrow cancelled");
        Ok(cancelled)
    }

    /// Fetch an escrow snapshot
    pub async fn escrow(&self, escrow_id: &EscrowId) -> Result<Escrow> {
        self.store.escrow(escrow_id).await
    }

    /// Non-terminal escrows holding funds on a wallet
    pub async fn active_escrows_for(&self, wallet: &WalletId) -> Vec<Escrow> {
        self.store.active_escrows_for(wallet).await
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
    async fn lock_requires_available_funds() {
        let store = Arc::new(LedgerStore::new());
        let manager = EscrowManager::new(store.clone());
        let wallet = wallet_with(&store, 50).await;

        let err = manager
            .lock_funds(&wallet, Amount::new(51), "job", "done")
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::InsufficientFunds { .. }));

        manager
            .lock_funds(&wallet, Amount::new(50), "job", "done")
            .await
            .unwrap();
        let w = store.wallet(&wallet).await.unwrap();
        assert_eq!(w.reserved, Amount::new(50));
        assert_eq!(w.available, Amount::zero());
    }

    #[tokio::test]
    async fn full_release_pays_recipient_and_terminates() {
        let store = Arc::new(LedgerStore::new());
        let manager = EscrowManager::new(store.clone());
        let source = wallet_with(&store, 100).await;
        let recipient = wallet_with(&store, 0).await;

        let escrow = manager
            .lock_funds(&source, Amount::new(40), "job", "done")
            .await
            .unwrap();
        let (released, _) = manager.release_funds(&escrow.id, &recipient).await.unwrap();

        assert!(released.is_released());
        assert_eq!(store.wallet(&source).await.unwrap().balance, Amount::new(60));
        assert_eq!(store.wallet(&source).await.unwrap().reserved, Amount::zero());
        assert_eq!(store.wallet(&recipient).await.unwrap().balance, Amount::new(40));

        let err = manager.release_funds(&escrow.id, &recipient).await.unwrap_err();
        assert!(matches!(err, CreditError::EscrowAlreadyReleased { .. }));
    }

    #[tokio::test]
    async fn partial_release_keeps_remainder_locked() {
        let store = Arc::new(LedgerStore::new());
        let manager = EscrowManager::new(store.clone());
        let source = wallet_with(&store, 100).await;
        let recipient = wallet_with(&store, 0).await;

        let escrow = manager
            .lock_funds(&source, Amount::new(40), "job", "done")
            .await
            .unwrap();
        let (after, _) = manager
            .partial_release(&escrow.id, &recipient, Amount::new(15))
            .await
            .unwrap();

        assert!(!after.is_released());
        assert_eq!(after.amount, Amount::new(25));
        let w = store.wallet(&source).await.unwrap();
        assert_eq!(w.balance, Amount::new(85));
        assert_eq!(w.reserved, Amount::new(25));
        assert_eq!(store.wallet(&recipient).await.unwrap().balance, Amount::new(15));

        // A partial release of the whole remainder terminates it
        let (after, _) = manager
            .partial_release(&escrow.id, &recipient, Amount::new(25))
            .await
            .unwrap();
        assert!(after.is_released());
    }

    #[tokio::test]
    async fn partial_release_cannot_exceed_remainder() {
        let store = Arc::new(LedgerStore::new());
        let manager = EscrowManager::new(store.clone());
        let source = wallet_with(&store, 100).await;
        let recipient = wallet_with(&store, 0).await;

        let escrow = manager
            .lock_funds(&source, Amount::new(40), "job", "done")
            .await
            .unwrap();
        let err = manager
            .partial_release(&escrow.id, &recipient, Amount::new(41))
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::EscrowAmountExceeded { .. }));
    }

    #[tokio::test]
    async fn cancel_restores_available_without_transfer() {
        let store = Arc::new(LedgerStore::new());
        let manager = EscrowManager::new(store.clone());
        let source = wallet_with(&store, 100).await;

        let escrow = manager
            .lock_funds(&source, Amount::new(40), "job", "done")
            .await
            .unwrap();
        let journal_before = store.transfer_count().await;

        let cancelled = manager.cancel_escrow(&escrow.id).await.unwrap();
        assert!(cancelled.is_released());

        let w = store.wallet(&source).await.unwrap();
        assert_eq!(w.balance, Amount::new(100));
        assert_eq!(w.available, Amount::new(100));
        assert_eq!(store.transfer_count().await, journal_before);

        let err = manager.cancel_escrow(&escrow.id).await.unwrap_err();
        assert!(matches!(err, CreditError::EscrowAlreadyReleased { .. }));
    }

    #[tokio::test]
    async fn release_to_source_returns_funds_to_available() {
        let store = Arc::new(LedgerStore::new());
        let manager = EscrowManager::new(store.clone());
        let source = wallet_with(&store, 100).await;

        let escrow = manager
            .lock_funds(&source, Amount::new(30), "refund", "job abandoned")
            .await
            .unwrap();
        manager.release_funds(&escrow.id, &source).await.unwrap();

        let w = store.wallet(&source).await.unwrap();
        assert_eq!(w.balance, Amount::new(100));
        assert_eq!(w.reserved, Amount::zero());
        assert_eq!(w.available, Amount::new(100));
    }
}
