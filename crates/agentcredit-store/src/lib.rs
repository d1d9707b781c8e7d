//! AgentCredit Ledger Store - the single shared mutable resource
//!
//! The store owns every Wallet, Lien, Escrow, Transfer, RoyaltyAgreement
//! and Bond record. Services hold no private copies; every read and write
//! goes through the store so the `available` recalculation is never
//! skipped.
//!
//! # Concurrency
//!
//! Two layers of locking:
//!
//! 1. **Per-wallet mutexes** (`lock_wallet` / `lock_wallet_pair`) give
//!    each logical operation an exclusive critical section per wallet.
//!    Two-wallet operations always acquire the lower-sorted wallet id
//!    first, which gives a total lock order and rules out deadlock.
//! 2. **Table guards**: every `apply_*` primitive takes the table write
//!    guards it needs in a fixed order (wallets, liens, escrows,
//!    transfers) and recomputes `available` before releasing them, so a
//!    reader on the wallets table never observes a half-updated wallet.
//!
//! The per-wallet **deposit gate** serializes deposit + auto-settlement
//! sequences on a wallet without blocking unrelated transfers.
//!
//! # Invariants
//!
//! 1. `available == max(0, balance - reserved - unsettled liens)` at rest
//! 2. Wallet balances never go negative
//! 3. The transfer journal is append-only
//! 4. Mutation + recalculation is atomic per primitive

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use agentcredit_types::{
    AgentId, AgreementId, Amount, Bond, BondId, BondStatus, BondTermsUpdate, CreditError, Escrow,
    EscrowId, Lien, LienId, Result, RoyaltyAgreement, RoyaltyTrigger, Transfer, TransferKind,
    Wallet, WalletId,
};

/// Guards for a two-wallet critical section, acquired in id order
pub struct WalletPairGuard {
    _first: OwnedMutexGuard<()>,
    _second: Option<OwnedMutexGuard<()>>,
}

/// A wallet and its derived fields recomputed from the same snapshot
#[derive(Debug, Clone)]
pub struct WalletAudit {
    /// The stored wallet
    pub wallet: Wallet,
    /// Sum of active escrow amounts at the snapshot
    pub expected_reserved: Amount,
    /// Balance net of reserved and unsettled liens at the snapshot
    pub expected_available: Amount,
}

/// The AgentCredit Ledger Store
///
/// Constructed once at process start and shared as `Arc<LedgerStore>`
/// across services; there are no process-wide singletons.
pub struct LedgerStore {
    wallets: RwLock<HashMap<WalletId, Wallet>>,
    owner_index: RwLock<HashMap<AgentId, WalletId>>,
    liens: RwLock<HashMap<LienId, Lien>>,
    escrows: RwLock<HashMap<EscrowId, Escrow>>,
    agreements: RwLock<HashMap<AgreementId, RoyaltyAgreement>>,
    bonds: RwLock<HashMap<BondId, Bond>>,
    /// Append-only journal of every balance movement
    transfers: RwLock<Vec<Transfer>>,
    /// Per-wallet operation mutexes
    wallet_locks: DashMap<WalletId, Arc<Mutex<()>>>,
    /// Per-wallet deposit + auto-settlement serialization
    deposit_gates: DashMap<WalletId, Arc<Mutex<()>>>,
}

impl LedgerStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
            owner_index: RwLock::new(HashMap::new()),
            liens: RwLock::new(HashMap::new()),
            escrows: RwLock::new(HashMap::new()),
            agreements: RwLock::new(HashMap::new()),
            bonds: RwLock::new(HashMap::new()),
            transfers: RwLock::new(Vec::new()),
            wallet_locks: DashMap::new(),
            deposit_gates: DashMap::new(),
        }
    }

    // ========================================================================
    // Wallet locks
    // ========================================================================

    fn wallet_mutex(&self, id: &WalletId) -> Arc<Mutex<()>> {
        self.wallet_locks.entry(*id).or_default().clone()
    }

    /// Acquire the exclusive operation lock for one wallet
    pub async fn lock_wallet(&self, id: &WalletId) -> OwnedMutexGuard<()> {
        let mutex = self.wallet_mutex(id);
        mutex.lock_owned().await
    }

    /// Acquire the operation locks for a wallet pair, lower id first
    pub async fn lock_wallet_pair(&self, a: &WalletId, b: &WalletId) -> WalletPairGuard {
        if a == b {
            return WalletPairGuard {
                _first: self.lock_wallet(a).await,
                _second: None,
            };
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.lock_wallet(first).await;
        let second_guard = self.lock_wallet(second).await;
        WalletPairGuard {
            _first: first_guard,
            _second: Some(second_guard),
        }
    }

    /// Acquire the deposit gate for a wallet. Held across a deposit and
    /// its lien auto-settlement so concurrent deposits' settlement runs
    /// never interleave.
    pub async fn lock_deposit_gate(&self, id: &WalletId) -> OwnedMutexGuard<()> {
        let mutex = self.deposit_gates.entry(*id).or_default().clone();
        mutex.lock_owned().await
    }

    // ========================================================================
    // Wallet records
    // ========================================================================

    /// Insert a new wallet; the owning agent must not already have one
    pub async fn insert_wallet(&self, wallet: Wallet) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        let mut owners = self.owner_index.write().await;

        if let Some(existing) = owners.get(&wallet.owner_agent_id) {
            return Err(CreditError::WalletExists {
                agent_id: wallet.owner_agent_id.to_string(),
                wallet_id: existing.to_string(),
            });
        }

        owners.insert(wallet.owner_agent_id, wallet.id);
        wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    /// Fetch a wallet snapshot
    pub async fn wallet(&self, id: &WalletId) -> Result<Wallet> {
        self.wallets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CreditError::WalletNotFound {
                wallet_id: id.to_string(),
            })
    }

    /// Fetch the wallet owned by an agent, if any
    pub async fn wallet_for_agent(&self, agent: &AgentId) -> Option<Wallet> {
        let owners = self.owner_index.read().await;
        let id = owners.get(agent)?;
        self.wallets.read().await.get(id).cloned()
    }

    /// Snapshot of every wallet (integrity sweeps)
    pub async fn all_wallets(&self) -> Vec<Wallet> {
        self.wallets.read().await.values().cloned().collect()
    }

    /// Capture every wallet with its recomputed derived fields in one
    /// consistent snapshot
    ///
    /// The wallets, liens and escrows read guards are held together for
    /// the whole capture. Since every `apply_*` primitive commits its
    /// mutation and recalculation under the wallets write guard, this
    /// snapshot can only observe rest states; a sweep over it never sees
    /// a wallet from before a commit next to tables from after it.
    pub async fn audit_wallets(&self) -> Vec<WalletAudit> {
        let wallets = self.wallets.read().await;
        let liens = self.liens.read().await;
        let escrows = self.escrows.read().await;

        wallets
            .values()
            .map(|wallet| {
                let expected_reserved: Amount = escrows
                    .values()
                    .filter(|e| e.wallet == wallet.id && !e.is_released())
                    .map(|e| e.amount)
                    .sum();
                let lien_total = Self::unsettled_total(&liens, &wallet.id);
                let expected_available = wallet
                    .balance
                    .saturating_sub(wallet.reserved)
                    .saturating_sub(lien_total);
                WalletAudit {
                    wallet: wallet.clone(),
                    expected_reserved,
                    expected_available,
                }
            })
            .collect()
    }

    fn get_wallet<'a>(
        wallets: &'a HashMap<WalletId, Wallet>,
        id: &WalletId,
    ) -> Result<&'a Wallet> {
        wallets.get(id).ok_or_else(|| CreditError::WalletNotFound {
            wallet_id: id.to_string(),
        })
    }

    fn unsettled_total(liens: &HashMap<LienId, Lien>, wallet: &WalletId) -> Amount {
        liens
            .values()
            .filter(|l| &l.debtor_wallet == wallet && !l.is_settled())
            .map(|l| l.amount)
            .sum()
    }

    // ========================================================================
    // Balance primitives
    //
    // Callers must hold the wallet operation lock(s); each primitive
    // performs the full mutate + recalculate sequence under the table
    // guards.
    // ========================================================================

    /// Credit an external deposit and journal it
    pub async fn apply_deposit(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
        memo: &str,
    ) -> Result<(Wallet, Transfer)> {
        let mut wallets = self.wallets.write().await;
        let liens = self.liens.read().await;
        let mut transfers = self.transfers.write().await;

        let wallet = wallets
            .get_mut(wallet_id)
            .ok_or_else(|| CreditError::WalletNotFound {
                wallet_id: wallet_id.to_string(),
            })?;

        wallet.balance = wallet.balance.checked_add(amount)?;
        wallet.recalculate_available(Self::unsettled_total(&liens, wallet_id));

        let transfer = Transfer::deposit(*wallet_id, amount, memo);
        transfers.push(transfer.clone());
        debug!(wallet = %wallet_id, %amount, "deposit applied");
        Ok((wallet.clone(), transfer))
    }

    /// Move funds between two wallets, checked against the debtor's
    /// current `available`, and journal the movement
    pub async fn apply_transfer(
        &self,
        from: &WalletId,
        to: &WalletId,
        amount: Amount,
        memo: &str,
        kind: TransferKind,
    ) -> Result<(Wallet, Wallet, Transfer)> {
        if from == to {
            return Err(CreditError::invalid_input(
                "to_wallet",
                "transfer source and destination must differ",
            ));
        }

        let mut wallets = self.wallets.write().await;
        let liens = self.liens.read().await;
        let mut transfers = self.transfers.write().await;

        let from_wallet = Self::get_wallet(&wallets, from)?;
        if from_wallet.available < amount {
            return Err(CreditError::InsufficientFunds {
                wallet_id: from.to_string(),
                requested: amount.minor_units(),
                available: from_wallet.available.minor_units(),
            });
        }
        Self::get_wallet(&wallets, to)?;

        let debited = {
            let w = wallets.get_mut(from).expect("checked above");
            w.balance = w.balance.checked_sub(amount)?;
            w.recalculate_available(Self::unsettled_total(&liens, from));
            w.clone()
        };
        let credited = {
            let w = wallets.get_mut(to).expect("checked above");
            w.balance = w.balance.checked_add(amount)?;
            w.recalculate_available(Self::unsettled_total(&liens, to));
            w.clone()
        };

        let transfer = Transfer::internal(*from, *to, amount, memo, kind);
        transfers.push(transfer.clone());
        debug!(%from, %to, %amount, ?kind, "transfer applied");
        Ok((debited, credited, transfer))
    }

    /// Adjust reserved funds by a signed delta, clamped at zero
    pub async fn apply_reserve_delta(&self, wallet_id: &WalletId, delta: i128) -> Result<Wallet> {
        let mut wallets = self.wallets.write().await;
        let liens = self.liens.read().await;

        let wallet = wallets
            .get_mut(wallet_id)
            .ok_or_else(|| CreditError::WalletNotFound {
                wallet_id: wallet_id.to_string(),
            })?;

        let reserved = wallet.reserved.minor_units().saturating_add(delta).max(0);
        wallet.reserved = Amount::new(reserved);
        wallet.recalculate_available(Self::unsettled_total(&liens, wallet_id));
        Ok(wallet.clone())
    }

    // ========================================================================
    // Lien primitives
    // ========================================================================

    /// Insert an unsettled lien and recalculate the debtor's available
    pub async fn apply_lien_create(&self, lien: Lien) -> Result<Lien> {
        let mut wallets = self.wallets.write().await;
        let mut liens = self.liens.write().await;

        Self::get_wallet(&wallets, &lien.creditor_wallet)?;
        let debtor_id = lien.debtor_wallet;
        let debtor = wallets
            .get_mut(&debtor_id)
            .ok_or_else(|| CreditError::WalletNotFound {
                wallet_id: debtor_id.to_string(),
            })?;

        liens.insert(lien.id, lien.clone());
        debtor.recalculate_available(Self::unsettled_total(&liens, &debtor_id));
        Ok(lien)
    }

    /// Settle a lien in full: pay the creditor out of the debtor's
    /// balance net of reserved, mark it settled, journal the transfer
    ///
    /// The lien's own claim does not count against settlement capacity -
    /// it is exactly what the payoff discharges.
    pub async fn apply_lien_settlement(&self, lien_id: &LienId) -> Result<(Lien, Transfer)> {
        let mut wallets = self.wallets.write().await;
        let mut liens = self.liens.write().await;
        let mut transfers = self.transfers.write().await;

        let lien = liens.get(lien_id).ok_or_else(|| CreditError::LienNotFound {
            lien_id: lien_id.to_string(),
        })?;
        if lien.is_settled() {
            return Err(CreditError::LienAlreadySettled {
                lien_id: lien_id.to_string(),
            });
        }

        let (debtor_id, creditor_id, amount) =
            (lien.debtor_wallet, lien.creditor_wallet, lien.amount);

        let debtor = Self::get_wallet(&wallets, &debtor_id)?;
        let capacity = debtor.settleable_balance();
        if capacity < amount {
            return Err(CreditError::InsufficientFunds {
                wallet_id: debtor_id.to_string(),
                requested: amount.minor_units(),
                available: capacity.minor_units(),
            });
        }
        Self::get_wallet(&wallets, &creditor_id)?;

        {
            let lien = liens.get_mut(lien_id).expect("checked above");
            lien.settled_at = Some(Utc::now());
        }
        {
            let w = wallets.get_mut(&debtor_id).expect("checked above");
            w.balance = w.balance.checked_sub(amount)?;
            w.recalculate_available(Self::unsettled_total(&liens, &debtor_id));
        }
        {
            let w = wallets.get_mut(&creditor_id).expect("checked above");
            w.balance = w.balance.checked_add(amount)?;
            w.recalculate_available(Self::unsettled_total(&liens, &creditor_id));
        }

        let settled = liens.get(lien_id).expect("checked above").clone();
        let transfer = Transfer::internal(
            debtor_id,
            creditor_id,
            amount,
            format!("lien settlement: {}", settled.reason),
            TransferKind::LienSettlement,
        );
        transfers.push(transfer.clone());
        debug!(lien = %lien_id, %amount, "lien settled");
        Ok((settled, transfer))
    }

    /// Delete an unsettled lien without payment
    pub async fn apply_lien_cancel(&self, lien_id: &LienId) -> Result<Lien> {
        let mut wallets = self.wallets.write().await;
        let mut liens = self.liens.write().await;

        let lien = liens.get(lien_id).ok_or_else(|| CreditError::LienNotFound {
            lien_id: lien_id.to_string(),
        })?;
        if lien.is_settled() {
            return Err(CreditError::LienAlreadySettled {
                lien_id: lien_id.to_string(),
            });
        }

        let removed = liens.remove(lien_id).expect("checked above");
        if let Some(debtor) = wallets.get_mut(&removed.debtor_wallet) {
            debtor.recalculate_available(Self::unsettled_total(&liens, &removed.debtor_wallet));
        }
        Ok(removed)
    }

    /// Fetch a lien snapshot
    pub async fn lien(&self, id: &LienId) -> Result<Lien> {
        self.liens
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CreditError::LienNotFound {
                lien_id: id.to_string(),
            })
    }

    /// Unsettled liens against a debtor, in strict settlement order
    /// (ascending priority, then creation time)
    pub async fn unsettled_liens_for(&self, debtor: &WalletId) -> Vec<Lien> {
        let liens = self.liens.read().await;
        let mut out: Vec<Lien> = liens
            .values()
            .filter(|l| &l.debtor_wallet == debtor && !l.is_settled())
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        out
    }

    /// Total unsettled lien amount against a wallet
    pub async fn unsettled_lien_total(&self, debtor: &WalletId) -> Amount {
        Self::unsettled_total(&*self.liens.read().await, debtor)
    }

    // ========================================================================
    // Escrow primitives
    // ========================================================================

    /// Carve funds out of available into reserved and create the escrow
    pub async fn apply_escrow_lock(
        &self,
        wallet_id: &WalletId,
        amount: Amount,
        purpose: &str,
        release_condition: &str,
    ) -> Result<Escrow> {
        let mut wallets = self.wallets.write().await;
        let liens = self.liens.read().await;
        let mut escrows = self.escrows.write().await;

        let wallet = wallets
            .get_mut(wallet_id)
            .ok_or_else(|| CreditError::WalletNotFound {
                wallet_id: wallet_id.to_string(),
            })?;
        if wallet.available < amount {
            return Err(CreditError::InsufficientFunds {
                wallet_id: wallet_id.to_string(),
                requested: amount.minor_units(),
                available: wallet.available.minor_units(),
            });
        }

        wallet.reserved = wallet.reserved.checked_add(amount)?;
        wallet.recalculate_available(Self::unsettled_total(&liens, wallet_id));

        let escrow = Escrow::new(*wallet_id, amount, purpose, release_condition);
        escrows.insert(escrow.id, escrow.clone());
        debug!(wallet = %wallet_id, escrow = %escrow.id, %amount, "escrow locked");
        Ok(escrow)
    }

    /// Release part (or all) of an escrow to a recipient: moves funds
    /// out of the source's balance and reserved, into the recipient's
    /// balance, and journals the movement. Marks the escrow terminal
    /// when nothing remains.
    pub async fn apply_escrow_release(
        &self,
        escrow_id: &EscrowId,
        to: &WalletId,
        amount: Amount,
    ) -> Result<(Escrow, Transfer)> {
        let mut wallets = self.wallets.write().await;
        let liens = self.liens.read().await;
        let mut escrows = self.escrows.write().await;
        let mut transfers = self.transfers.write().await;

        let escrow = escrows
            .get(escrow_id)
            .ok_or_else(|| CreditError::EscrowNotFound {
                escrow_id: escrow_id.to_string(),
            })?;
        if escrow.is_released() {
            return Err(CreditError::EscrowAlreadyReleased {
                escrow_id: escrow_id.to_string(),
            });
        }
        if amount > escrow.amount {
            return Err(CreditError::EscrowAmountExceeded {
                escrow_id: escrow_id.to_string(),
                requested: amount.minor_units(),
                remaining: escrow.amount.minor_units(),
            });
        }
        let source_id = escrow.wallet;
        Self::get_wallet(&wallets, &source_id)?;
        Self::get_wallet(&wallets, to)?;

        if source_id == *to {
            // Releasing back to the source just un-reserves the funds
            let w = wallets.get_mut(&source_id).expect("checked above");
            w.reserved = w.reserved.saturating_sub(amount);
            w.recalculate_available(Self::unsettled_total(&liens, &source_id));
        } else {
            {
                let w = wallets.get_mut(&source_id).expect("checked above");
                w.balance = w.balance.checked_sub(amount)?;
                w.reserved = w.reserved.saturating_sub(amount);
                w.recalculate_available(Self::unsettled_total(&liens, &source_id));
            }
            {
                let w = wallets.get_mut(to).expect("checked above");
                w.balance = w.balance.checked_add(amount)?;
                w.recalculate_available(Self::unsettled_total(&liens, to));
            }
        }

        let escrow = escrows.get_mut(escrow_id).expect("checked above");
        escrow.amount = escrow.amount.saturating_sub(amount);
        if escrow.amount.is_zero() {
            escrow.released_at = Some(Utc::now());
        }
        let snapshot = escrow.clone();

        let transfer = Transfer::internal(
            source_id,
            *to,
            amount,
            format!("escrow release: {}", snapshot.purpose),
            TransferKind::EscrowRelease,
        );
        transfers.push(transfer.clone());
        debug!(escrow = %escrow_id, %amount, remaining = %snapshot.amount, "escrow released");
        Ok((snapshot, transfer))
    }

    /// Cancel an escrow: return the remaining funds to available with no
    /// transfer, and mark it terminal
    pub async fn apply_escrow_cancel(&self, escrow_id: &EscrowId) -> Result<Escrow> {
        let mut wallets = self.wallets.write().await;
        let liens = self.liens.read().await;
        let mut escrows = self.escrows.write().await;

        let escrow = escrows
            .get_mut(escrow_id)
            .ok_or_else(|| CreditError::EscrowNotFound {
                escrow_id: escrow_id.to_string(),
            })?;
        if escrow.is_released() {
            return Err(CreditError::EscrowAlreadyReleased {
                escrow_id: escrow_id.to_string(),
            });
        }

        let remaining = escrow.amount;
        escrow.amount = Amount::zero();
        escrow.released_at = Some(Utc::now());
        let snapshot = escrow.clone();

        if let Some(wallet) = wallets.get_mut(&snapshot.wallet) {
            wallet.reserved = wallet.reserved.saturating_sub(remaining);
            wallet.recalculate_available(Self::unsettled_total(&liens, &snapshot.wallet));
        }
        debug!(escrow = %escrow_id, returned = %remaining, "escrow cancelled");
        Ok(snapshot)
    }

    /// Fetch an escrow snapshot
    pub async fn escrow(&self, id: &EscrowId) -> Result<Escrow> {
        self.escrows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CreditError::EscrowNotFound {
                escrow_id: id.to_string(),
            })
    }

    /// Non-terminal escrows against a wallet
    pub async fn active_escrows_for(&self, wallet: &WalletId) -> Vec<Escrow> {
        self.escrows
            .read()
            .await
            .values()
            .filter(|e| &e.wallet == wallet && !e.is_released())
            .cloned()
            .collect()
    }

    /// Sum of active escrow amounts against a wallet (expected reserved)
    pub async fn active_escrow_total(&self, wallet: &WalletId) -> Amount {
        self.escrows
            .read()
            .await
            .values()
            .filter(|e| &e.wallet == wallet && !e.is_released())
            .map(|e| e.amount)
            .sum()
    }

    // ========================================================================
    // Transfer journal
    // ========================================================================

    /// Transfers touching a wallet, oldest first
    pub async fn transfers_for(&self, wallet: &WalletId) -> Vec<Transfer> {
        self.transfers
            .read()
            .await
            .iter()
            .filter(|t| &t.to_wallet == wallet || t.from_wallet.as_ref() == Some(wallet))
            .cloned()
            .collect()
    }

    /// Total number of journal entries
    pub async fn transfer_count(&self) -> usize {
        self.transfers.read().await.len()
    }

    /// Most recent journal entries, newest first
    pub async fn recent_transfers(&self, limit: usize) -> Vec<Transfer> {
        let transfers = self.transfers.read().await;
        transfers.iter().rev().take(limit).cloned().collect()
    }

    // ========================================================================
    // Royalty agreements
    // ========================================================================

    /// Insert a royalty agreement
    pub async fn insert_agreement(&self, agreement: RoyaltyAgreement) -> Result<RoyaltyAgreement> {
        let wallets = self.wallets.read().await;
        Self::get_wallet(&wallets, &agreement.source_wallet)?;
        Self::get_wallet(&wallets, &agreement.recipient_wallet)?;
        drop(wallets);

        self.agreements
            .write()
            .await
            .insert(agreement.id, agreement.clone());
        Ok(agreement)
    }

    /// Fetch an agreement snapshot
    pub async fn agreement(&self, id: &AgreementId) -> Result<RoyaltyAgreement> {
        self.agreements
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CreditError::AgreementNotFound {
                agreement_id: id.to_string(),
            })
    }

    /// Flip an agreement's active flag
    pub async fn set_agreement_active(
        &self,
        id: &AgreementId,
        active: bool,
    ) -> Result<RoyaltyAgreement> {
        let mut agreements = self.agreements.write().await;
        let agreement = agreements
            .get_mut(id)
            .ok_or_else(|| CreditError::AgreementNotFound {
                agreement_id: id.to_string(),
            })?;
        agreement.active = active;
        Ok(agreement.clone())
    }

    /// All active agreements for a (source, trigger) pair
    pub async fn active_agreements(
        &self,
        source: &WalletId,
        trigger: RoyaltyTrigger,
    ) -> Vec<RoyaltyAgreement> {
        self.agreements
            .read()
            .await
            .values()
            .filter(|a| a.active && &a.source_wallet == source && a.trigger == trigger)
            .cloned()
            .collect()
    }

    /// Every agreement naming a wallet as source
    pub async fn agreements_for_source(&self, source: &WalletId) -> Vec<RoyaltyAgreement> {
        self.agreements
            .read()
            .await
            .values()
            .filter(|a| &a.source_wallet == source)
            .cloned()
            .collect()
    }

    // ========================================================================
    // Bonds
    // ========================================================================

    /// Insert a bond
    pub async fn insert_bond(&self, bond: Bond) -> Result<Bond> {
        let wallets = self.wallets.read().await;
        Self::get_wallet(&wallets, &bond.issuer_wallet)?;
        drop(wallets);

        self.bonds.write().await.insert(bond.id, bond.clone());
        Ok(bond)
    }

    /// Fetch a bond snapshot
    pub async fn bond(&self, id: &BondId) -> Result<Bond> {
        self.bonds
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CreditError::BondNotFound {
                bond_id: id.to_string(),
            })
    }

    /// Record a purchase: set holder and purchase price
    pub async fn set_bond_holder(
        &self,
        id: &BondId,
        holder: WalletId,
        price: Amount,
    ) -> Result<Bond> {
        let mut bonds = self.bonds.write().await;
        let bond = bonds.get_mut(id).ok_or_else(|| CreditError::BondNotFound {
            bond_id: id.to_string(),
        })?;
        if bond.is_held() {
            return Err(CreditError::BondAlreadyPurchased {
                bond_id: id.to_string(),
            });
        }
        bond.holder_wallet = Some(holder);
        bond.purchase_price = Some(price);
        Ok(bond.clone())
    }

    /// Transition a bond's lifecycle state
    pub async fn set_bond_status(&self, id: &BondId, status: BondStatus) -> Result<Bond> {
        let mut bonds = self.bonds.write().await;
        let bond = bonds.get_mut(id).ok_or_else(|| CreditError::BondNotFound {
            bond_id: id.to_string(),
        })?;
        bond.status = status;
        Ok(bond.clone())
    }

    /// Apply a validated terms update to an unheld bond
    pub async fn update_bond_terms(&self, id: &BondId, update: &BondTermsUpdate) -> Result<Bond> {
        let mut bonds = self.bonds.write().await;
        let bond = bonds.get_mut(id).ok_or_else(|| CreditError::BondNotFound {
            bond_id: id.to_string(),
        })?;
        if let Some(face_value) = update.face_value {
            bond.face_value = face_value;
        }
        if let Some(pct) = update.royalty_percentage {
            bond.royalty_percentage = pct;
        }
        if let Some(date) = update.maturity_date {
            bond.maturity_date = date;
        }
        Ok(bond.clone())
    }

    /// Remove a bond record (unheld cancellation)
    pub async fn remove_bond(&self, id: &BondId) -> Result<Bond> {
        self.bonds
            .write()
            .await
            .remove(id)
            .ok_or_else(|| CreditError::BondNotFound {
                bond_id: id.to_string(),
            })
    }

    /// Bonds issued by a wallet
    pub async fn bonds_issued_by(&self, issuer: &WalletId) -> Vec<Bond> {
        self.bonds
            .read()
            .await
            .values()
            .filter(|b| &b.issuer_wallet == issuer)
            .cloned()
            .collect()
    }

    /// Active, unheld bonds available for purchase
    pub async fn listed_bonds(&self) -> Vec<Bond> {
        self.bonds
            .read()
            .await
            .values()
            .filter(|b| b.is_listed())
            .cloned()
            .collect()
    }

    /// Active, held bonds at or past maturity (default sweep input)
    pub async fn held_bonds_past_maturity(&self, now: chrono::DateTime<Utc>) -> Vec<Bond> {
        self.bonds
            .read()
            .await
            .values()
            .filter(|b| b.status == BondStatus::Active && b.is_held() && b.is_past_maturity(now))
            .cloned()
            .collect()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
