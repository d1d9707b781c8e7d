//! AgentCredit Wallet Ledger - balance movements and the available invariant
//!
//! The Wallet Ledger owns the `balance` / `reserved` / `available`
//! invariant and executes deposits and internal transfers. Every
//! mutation runs inside the store's per-wallet critical section and
//! recomputes `available` before the section ends; the ledger itself
//! never caches wallet fields across an await.

use std::sync::Arc;

use tracing::info;

use agentcredit_store::LedgerStore;
use agentcredit_types::{
    AgentId, Amount, CreditError, Result, Transfer, TransferKind, Wallet, WalletId,
};

/// The Wallet Ledger service
///
/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct WalletLedger {
    store: Arc<LedgerStore>,
}

impl WalletLedger {
    /// Create a ledger over a shared store
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Create a wallet with zero balances for an agent
    ///
    /// Fails with `WalletExists` if the agent already owns one; wallets
    /// are never deleted, so this is a one-time operation per agent.
    pub async fn create_wallet(&self, owner_agent_id: AgentId) -> Result<Wallet> {
        let wallet = self.store.insert_wallet(Wallet::new(owner_agent_id)).await?;
        info!(wallet = %wallet.id, agent = %wallet.owner_agent_id, "wallet created");
        Ok(wallet)
    }

    /// Credit an external deposit
    ///
    /// Journals a Transfer with no `from_wallet`; this is the only way
    /// total system balance increases.
    pub async fn deposit(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
        memo: &str,
    ) -> Result<(Wallet, Transfer)> {
        if !amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "deposit",
                "amount must be positive",
            ));
        }

        let _guard = self.store.lock_wallet(wallet_id).await;
        let (wallet, transfer) = self.store.apply_deposit(wallet_id, amount, memo).await?;
        info!(wallet = %wallet_id, %amount, "deposit committed");
        Ok((wallet, transfer))
    }

    /// Move funds between two wallets atomically
    ///
    /// Debits `from`, credits `to`, recalculates both `available`s and
    /// journals exactly one Transfer. The affordability check runs
    /// against the debtor's *current* available balance, inside the
    /// pair's critical section.
    pub async fn internal_transfer(
        &self,
        from: &WalletId,
        to: &WalletId,
        amount: Amount,
        memo: &str,
        kind: TransferKind,
    ) -> Result<Transfer> {
        if !amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "transfer",
                "amount must be positive",
            ));
        }

        let _guards = self.store.lock_wallet_pair(from, to).await;
        let (_, _, transfer) = self
            .store
            .apply_transfer(from, to, amount, memo, kind)
            .await?;
        info!(%from, %to, %amount, ?kind, "transfer committed");
        Ok(transfer)
    }

    /// Adjust a wallet's reserved funds by a signed delta
    ///
    /// Used by the Escrow Manager only; clamps at zero and recalculates
    /// `available` in the same critical section.
    pub async fn adjust_reserved(&self, wallet_id: &WalletId, delta: i128) -> Result<Wallet> {
        let _guard = self.store.lock_wallet(wallet_id).await;
        self.store.apply_reserve_delta(wallet_id, delta).await
    }

    /// Fetch a wallet snapshot
    pub async fn wallet(&self, wallet_id: &WalletId) -> Result<Wallet> {
        self.store.wallet(wallet_id).await
    }

    /// Fetch the wallet owned by an agent, if any
    pub async fn wallet_for_agent(&self, agent: &AgentId) -> Option<Wallet> {
        self.store.wallet_for_agent(agent).await
    }

    /// Transfer history touching a wallet, oldest first
    pub async fn transfers_for(&self, wallet_id: &WalletId) -> Vec<Transfer> {
        self.store.transfers_for(wallet_id).await
    }
}
