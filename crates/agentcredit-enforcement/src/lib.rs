//! AgentCredit Enforcement Orchestrator
//!
//! The enforcer composes the ledger, lien, escrow, royalty and bond
//! services behind the spend-gating workflow agents actually use:
//! check, reserve, complete, deposit. It is constructed with a treasury
//! wallet - the platform wallet that absorbs consumed compute charges
//! and holds overrun liens - because every balance reduction must be
//! expressible as a journaled transfer to somewhere.
//!
//! Enforcement is fail-closed: when affordability cannot be proven, the
//! spend is refused.

use std::sync::Arc;

use tracing::{info, warn};

use agentcredit_bonds::BondMarket;
use agentcredit_escrow::EscrowManager;
use agentcredit_ledger::WalletLedger;
use agentcredit_liens::LienManager;
use agentcredit_royalty::RoyaltyEngine;
use agentcredit_store::LedgerStore;
use agentcredit_types::{
    Amount, CreditError, Escrow, EscrowId, Lien, Result, RoyaltyTrigger, Transfer, Wallet,
    WalletId,
};

/// Outcome of a reconciled job completion
#[derive(Debug, Clone)]
pub struct JobCompletion {
    /// The escrow that backed the job
    pub escrow_id: EscrowId,
    /// Wallet that funded the job
    pub wallet: WalletId,
    /// Amount charged to the treasury
    pub charged: Amount,
    /// Locked amount returned to available
    pub refunded: Amount,
    /// Lien recorded for a cost overrun, if any
    pub overrun_lien: Option<Lien>,
    /// Royalty transfers fired by the completion
    pub royalties: Vec<Transfer>,
}

/// Outcome of a deposit and its lien auto-settlement
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    /// Wallet snapshot after settlement
    pub wallet: Wallet,
    /// The journaled deposit
    pub deposit: Transfer,
    /// Lien settlements triggered by the deposit, in priority order
    pub settled: Vec<Transfer>,
}

impl DepositOutcome {
    /// Available balance once the dust settles
    pub fn net_available(&self) -> Amount {
        self.wallet.available
    }
}

/// Result of a full-system integrity sweep
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    /// Wallets examined
    pub wallets_checked: usize,
    /// Exact mismatches between stored and recomputed fields
    pub violations: Vec<CreditError>,
}

impl IntegrityReport {
    /// Whether every wallet checked out
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The Enforcement Orchestrator
#[derive(Clone)]
pub struct CreditEnforcer {
    store: Arc<LedgerStore>,
    ledger: WalletLedger,
    liens: LienManager,
    escrow: EscrowManager,
    royalty: RoyaltyEngine,
    bonds: BondMarket,
    treasury: WalletId,
}

impl CreditEnforcer {
    /// Build the orchestrator over a shared store
    ///
    /// `treasury` must be an existing wallet; consumed job costs are
    /// paid into it and overrun liens name it as creditor.
    pub fn new(store: Arc<LedgerStore>, treasury: WalletId) -> Self {
        Self {
            ledger: WalletLedger::new(store.clone()),
            liens: LienManager::new(store.clone()),
            escrow: EscrowManager::new(store.clone()),
            royalty: RoyaltyEngine::new(store.clone()),
            bonds: BondMarket::new(store.clone()),
            store,
            treasury,
        }
    }

    /// The wallet ledger behind this enforcer
    pub fn ledger(&self) -> &WalletLedger {
        &self.ledger
    }

    /// The lien manager behind this enforcer
    pub fn liens(&self) -> &LienManager {
        &self.liens
    }

    /// The escrow manager behind this enforcer
    pub fn escrow(&self) -> &EscrowManager {
        &self.escrow
    }

    /// The royalty engine behind this enforcer
    pub fn royalty(&self) -> &RoyaltyEngine {
        &self.royalty
    }

    /// The bond market behind this enforcer
    pub fn bonds(&self) -> &BondMarket {
        &self.bonds
    }

    /// The treasury wallet absorbing consumed charges
    pub fn treasury(&self) -> &WalletId {
        &self.treasury
    }

    /// Whether a wallet can afford a spend right now. Never mutates.
    ///
    /// True only when the wallet exists and its available balance
    /// covers the amount; an unknown wallet cannot spend.
    pub async fn can_spend(&self, wallet_id: &WalletId, amount: Amount) -> Result<bool> {
        if !amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "spend",
                "amount must be positive",
            ));
        }
        match self.store.wallet(wallet_id).await {
            Ok(wallet) => Ok(wallet.available >= amount),
            Err(CreditError::WalletNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reserve the estimated cost of a job in escrow
    ///
    /// Fail-closed: refuses up front when the estimate is not
    /// affordable; the definitive check re-runs inside the lock.
    pub async fn reserve_for_job(
        &self,
        wallet_id: &WalletId,
        estimated_cost: Amount,
        job_id: &str,
    ) -> Result<Escrow> {
        if !self.can_spend(wallet_id, estimated_cost).await? {
            let wallet = self.store.wallet(wallet_id).await?;
            return Err(CreditError::InsufficientFunds {
                wallet_id: wallet_id.to_string(),
                requested: estimated_cost.minor_units(),
                available: wallet.available.minor_units(),
            });
        }

        let escrow = self
            .escrow
            .lock_funds(wallet_id, estimated_cost, job_id, "job completion")
            .await?;
        info!(wallet = %wallet_id, job = job_id, estimate = %estimated_cost, "job reserved");
        Ok(escrow)
    }

    /// Reconcile a finished job against its reservation
    ///
    /// The actual cost is charged to the treasury and any unspent
    /// remainder returns to the wallet's available balance. A cost
    /// overrun beyond the locked amount becomes a priority-0 lien held
    /// by the treasury. Afterwards, completion royalties fire: savings
    /// trigger `OnSavings`, consumed compute triggers `OnCompute`; a
    /// royalty failure never undoes a completed job.
    pub async fn complete_job(
        &self,
        escrow_id: &EscrowId,
        actual_cost: Amount,
        savings_generated: Amount,
    ) -> Result<JobCompletion> {
        if actual_cost.is_negative() {
            return Err(CreditError::invalid_amount(
                "actual_cost",
                "cannot be negative",
            ));
        }
        if savings_generated.is_negative() {
            return Err(CreditError::invalid_amount(
                "savings_generated",
                "cannot be negative",
            ));
        }

        let escrow = self.escrow.escrow(escrow_id).await?;
        if escrow.is_released() {
            return Err(CreditError::EscrowAlreadyReleased {
                escrow_id: escrow_id.to_string(),
            });
        }
        let wallet_id = escrow.wallet;
        let locked = escrow.amount;

        let (charged, refunded, overrun_lien) = if actual_cost.is_zero() {
            // Nothing consumed, full refund
            self.escrow.cancel_escrow(escrow_id).await?;
            (Amount::zero(), locked, None)
        } else if actual_cost < locked {
            // Charge what was used, return the rest
            self.charge_or_abort(escrow_id, actual_cost).await?;
            self.escrow.cancel_escrow(escrow_id).await?;
            (actual_cost, locked.saturating_sub(actual_cost), None)
        } else if actual_cost == locked {
            // Fully consumed
            self.release_all_or_abort(escrow_id).await?;
            (locked, Amount::zero(), None)
        } else {
            // Overrun: the locked amount is consumed and the shortfall
            // becomes senior debt to the treasury
            self.release_all_or_abort(escrow_id).await?;
            let shortfall = actual_cost.saturating_sub(locked);
            let lien = self
                .liens
                .create_lien(
                    &wallet_id,
                    &self.treasury,
                    shortfall,
                    &format!("job overrun: {}", escrow.purpose),
                    0,
                )
                .await?;
            warn!(
                escrow = %escrow_id,
                wallet = %wallet_id,
                %shortfall,
                "job overran its reservation"
            );
            (locked, Amount::zero(), Some(lien))
        };

        let mut royalties = Vec::new();
        if savings_generated.is_positive() {
            match self
                .royalty
                .distribute(&wallet_id, RoyaltyTrigger::OnSavings, savings_generated)
                .await
            {
                Ok(transfers) => royalties.extend(transfers),
                Err(e) => warn!(wallet = %wallet_id, error = %e, "savings royalties skipped"),
            }
        }
        if charged.is_positive() {
            match self
                .royalty
                .distribute(&wallet_id, RoyaltyTrigger::OnCompute, actual_cost)
                .await
            {
                Ok(transfers) => royalties.extend(transfers),
                Err(e) => warn!(wallet = %wallet_id, error = %e, "compute royalties skipped"),
            }
        }

        info!(
            escrow = %escrow_id,
            wallet = %wallet_id,
            %charged,
            %refunded,
            overrun = overrun_lien.is_some(),
            "job completed"
        );
        Ok(JobCompletion {
            escrow_id: *escrow_id,
            wallet: wallet_id,
            charged,
            refunded,
            overrun_lien,
            royalties,
        })
    }

    /// Charge part of an escrow to the treasury; cancel it on failure
    async fn charge_or_abort(&self, escrow_id: &EscrowId, amount: Amount) -> Result<Transfer> {
        match self
            .escrow
            .partial_release(escrow_id, &self.treasury, amount)
            .await
        {
            Ok((_, transfer)) => Ok(transfer),
            Err(e) => {
                // The escrow must not stay live after a failed charge
                if let Err(cancel_err) = self.escrow.cancel_escrow(escrow_id).await {
                    warn!(escrow = %escrow_id, error = %cancel_err, "abort cancel failed");
                }
                Err(e)
            }
        }
    }

    /// Release a whole escrow to the treasury; cancel it on failure
    async fn release_all_or_abort(&self, escrow_id: &EscrowId) -> Result<Transfer> {
        match self.escrow.release_funds(escrow_id, &self.treasury).await {
            Ok((_, transfer)) => Ok(transfer),
            Err(e) => {
                if let Err(cancel_err) = self.escrow.cancel_escrow(escrow_id).await {
                    warn!(escrow = %escrow_id, error = %cancel_err, "abort cancel failed");
                }
                Err(e)
            }
        }
    }

    /// Credit a deposit, then settle liens in strict priority order
    ///
    /// The whole sequence holds the wallet's deposit gate, so two
    /// concurrent deposits can never interleave their settlement walks.
    pub async fn process_deposit(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
    ) -> Result<DepositOutcome> {
        let _gate = self.store.lock_deposit_gate(wallet_id).await;

        let (_, deposit) = self.ledger.deposit(wallet_id, amount, "deposit").await?;
        let settled = self.liens.auto_settle_on_deposit(wallet_id).await?;
        let wallet = self.store.wallet(wallet_id).await?;

        info!(
            wallet = %wallet_id,
            %amount,
            liens_settled = settled.len(),
            net_available = %wallet.available,
            "deposit processed"
        );
        Ok(DepositOutcome {
            wallet,
            deposit,
            settled,
        })
    }

    /// Recompute every wallet's derived fields and report exact mismatches
    ///
    /// Read-only and runnable at any time, including against live
    /// traffic: the store captures every wallet together with its
    /// recomputed `reserved` (sum of active escrow amounts) and
    /// `available` (balance net of reserved and unsettled liens) in one
    /// consistent snapshot, so a commit landing mid-sweep can never
    /// surface as a phantom violation.
    pub async fn validate_system_integrity(&self) -> IntegrityReport {
        let audits = self.store.audit_wallets().await;
        let mut report = IntegrityReport {
            wallets_checked: audits.len(),
            violations: Vec::new(),
        };

        for audit in audits {
            let wallet = audit.wallet;
            if wallet.reserved != audit.expected_reserved {
                report.violations.push(CreditError::SystemIntegrityViolation {
                    wallet_id: wallet.id.to_string(),
                    field: "reserved".to_string(),
                    stored: wallet.reserved.minor_units(),
                    expected: audit.expected_reserved.minor_units(),
                });
            }
            if wallet.available != audit.expected_available {
                report.violations.push(CreditError::SystemIntegrityViolation {
                    wallet_id: wallet.id.to_string(),
                    field: "available".to_string(),
                    stored: wallet.available.minor_units(),
                    expected: audit.expected_available.minor_units(),
                });
            }
        }

        if !report.is_valid() {
            warn!(
                wallets = report.wallets_checked,
                violations = report.violations.len(),
                "integrity sweep found mismatches"
            );
        }
        report
    }
}
