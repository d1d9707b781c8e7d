//! AgentCredit Royalty Engine - standing splits over gross proceeds
//!
//! A distribution fires every active agreement on a `(source, trigger)`
//! pair as one batch: each share is computed in basis points off the
//! gross event amount, zero shares are skipped, and the batch is
//! all-or-nothing. If the aggregate obligation exceeds the source's
//! available balance, no recipient is paid at all.

use std::sync::Arc;

use tracing::{debug, info, warn};

use agentcredit_store::LedgerStore;
use agentcredit_types::{
    AgreementId, Amount, CreditError, Result, RoyaltyAgreement, RoyaltyRate, RoyaltyTrigger,
    Transfer, TransferKind, WalletId,
};

/// The Royalty Engine service
#[derive(Clone)]
pub struct RoyaltyEngine {
    store: Arc<LedgerStore>,
}

impl RoyaltyEngine {
    /// Create a royalty engine over a shared store
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Register a standing split rule
    ///
    /// Rates on the same `(source, trigger)` pair may sum past 100%;
    /// the over-commitment surfaces at distribution time as an
    /// aggregate affordability failure, not here.
    pub async fn create_agreement(
        &self,
        source: &WalletId,
        recipient: &WalletId,
        rate: RoyaltyRate,
        trigger: RoyaltyTrigger,
    ) -> Result<RoyaltyAgreement> {
        if source == recipient {
            return Err(CreditError::invalid_input(
                "recipient_wallet",
                "royalty source and recipient must differ",
            ));
        }

        let agreement = self
            .store
            .insert_agreement(RoyaltyAgreement::new(*source, *recipient, rate, trigger))
            .await?;
        info!(
            agreement = %agreement.id,
            %source,
            %recipient,
            rate = %rate,
            %trigger,
            "royalty agreement created"
        );
        Ok(agreement)
    }

    /// Stop an agreement from firing; the record is kept
    pub async fn deactivate_agreement(&self, id: &AgreementId) -> Result<RoyaltyAgreement> {
        let agreement = self.store.set_agreement_active(id, false).await?;
        info!(agreement = %id, "royalty agreement deactivated");
        Ok(agreement)
    }

    /// Reactivate a dormant agreement
    pub async fn reactivate_agreement(&self, id: &AgreementId) -> Result<RoyaltyAgreement> {
        let agreement = self.store.set_agreement_active(id, true).await?;
        info!(agreement = %id, "royalty agreement reactivated");
        Ok(agreement)
    }

    /// Fire every active agreement on `(source, trigger)` for a gross event
    ///
    /// Returns the royalty transfers, one per non-zero share. The batch
    /// runs inside the source wallet's critical section so the upfront
    /// aggregate check stays valid while the individual payouts execute;
    /// recipient credits need no recipient lock.
    pub async fn distribute(
        &self,
        source: &WalletId,
        trigger: RoyaltyTrigger,
        event_amount: Amount,
    ) -> Result<Vec<Transfer>> {
        if !event_amount.is_positive() {
            return Err(CreditError::invalid_amount(
                "event",
                "amount must be positive",
            ));
        }

        let agreements = self.store.active_agreements(source, trigger).await;
        if agreements.is_empty() {
            debug!(%source, %trigger, "no active royalty agreements");
            return Ok(Vec::new());
        }

        // Compute every share first; the batch either fully pays or
        // fully fails.
        let mut shares = Vec::with_capacity(agreements.len());
        let mut required = Amount::zero();
        for agreement in &agreements {
            let share = agreement.rate.share_of(event_amount)?;
            if share.is_zero() {
                continue;
            }
            required = required.checked_add(share)?;
            shares.push((agreement, share));
        }
        if shares.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.store.lock_wallet(source).await;

        let wallet = self.store.wallet(source).await?;
        if wallet.available < required {
            return Err(CreditError::InsufficientFundsForRoyalties {
                wallet_id: source.to_string(),
                required: required.minor_units(),
                available: wallet.available.minor_units(),
            });
        }

        let mut transfers = Vec::with_capacity(shares.len());
        for (agreement, share) in shares {
            match self
                .store
                .apply_transfer(
                    source,
                    &agreement.recipient_wallet,
                    share,
                    &format!("royalty {} ({})", agreement.rate, trigger),
                    TransferKind::Royalty,
                )
                .await
            {
                Ok((_, _, transfer)) => transfers.push(transfer),
                // The aggregate was affordable upfront; a payout failing
                // here (recipient wallet gone) is skipped, not fatal
                Err(e) => {
                    warn!(agreement = %agreement.id, error = %e, "royalty payout skipped");
                }
            }
        }

        info!(
            %source,
            %trigger,
            gross = %event_amount,
            paid = %required,
            recipients = transfers.len(),
            "royalties distributed"
        );
        Ok(transfers)
    }

    /// Fetch an agreement snapshot
    pub async fn agreement(&self, id: &AgreementId) -> Result<RoyaltyAgreement> {
        self.store.agreement(id).await
    }

    /// Every agreement naming a wallet as source, active or not
    pub async fn agreements_for(&self, source: &WalletId) -> Vec<RoyaltyAgreement> {
        self.store.agreements_for_source(source).await
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
    async fn self_agreement_is_rejected() {
        let store = Arc::new(LedgerStore::new());
        let engine = RoyaltyEngine::new(store.clone());
        let source = wallet_with(&store, 0).await;

        let err = engine
            .create_agreement(
                &source,
                &source,
                RoyaltyRate::from_percent(10).unwrap(),
                RoyaltyTrigger::OnProfit,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn distribution_pays_each_active_agreement() {
        let store = Arc::new(LedgerStore::new());
        let engine = RoyaltyEngine::new(store.clone());
        let source = wallet_with(&store, 1_000).await;
        let r1 = wallet_with(&store, 0).await;
        let r2 = wallet_with(&store, 0).await;

        engine
            .create_agreement(&source, &r1, RoyaltyRate::from_percent(10).unwrap(), RoyaltyTrigger::OnProfit)
            .await
            .unwrap();
        engine
            .create_agreement(&source, &r2, RoyaltyRate::from_percent(5).unwrap(), RoyaltyTrigger::OnProfit)
            .await
            .unwrap();

        let transfers = engine
            .distribute(&source, RoyaltyTrigger::OnProfit, Amount::new(200))
            .await
            .unwrap();
        assert_eq!(transfers.len(), 2);

        assert_eq!(store.wallet(&r1).await.unwrap().balance, Amount::new(20));
        assert_eq!(store.wallet(&r2).await.unwrap().balance, Amount::new(10));
        assert_eq!(store.wallet(&source).await.unwrap().balance, Amount::new(970));
    }

    #[tokio::test]
    async fn distribution_is_all_or_nothing() {
        let store = Arc::new(LedgerStore::new());
        let engine = RoyaltyEngine::new(store.clone());
        let source = wallet_with(&store, 25).await;
        let r1 = wallet_with(&store, 0).await;
        let r2 = wallet_with(&store, 0).await;

        engine
            .create_agreement(&source, &r1, RoyaltyRate::from_percent(10).unwrap(), RoyaltyTrigger::OnSavings)
            .await
            .unwrap();
        engine
            .create_agreement(&source, &r2, RoyaltyRate::from_percent(20).unwrap(), RoyaltyTrigger::OnSavings)
            .await
            .unwrap();

        // 10% + 20% of 100 = 30 required; only 25 available
        let err = engine
            .distribute(&source, RoyaltyTrigger::OnSavings, Amount::new(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreditError::InsufficientFundsForRoyalties { required: 30, available: 25, .. }
        ));

        // Neither recipient was paid
        assert_eq!(store.wallet(&r1).await.unwrap().balance, Amount::zero());
        assert_eq!(store.wallet(&r2).await.unwrap().balance, Amount::zero());
        assert_eq!(store.wallet(&source).await.unwrap().balance, Amount::new(25));
    }

    #[tokio::test]
    async fn deactivated_agreements_do_not_fire() {
        let store = Arc::new(LedgerStore::new());
        let engine = RoyaltyEngine::new(store.clone());
        let source = wallet_with(&store, 100).await;
        let recipient = wallet_with(&store, 0).await;

        let agreement = engine
            .create_agreement(&source, &recipient, RoyaltyRate::from_percent(10).unwrap(), RoyaltyTrigger::OnCompute)
            .await
            .unwrap();
        engine.deactivate_agreement(&agreement.id).await.unwrap();

        let transfers = engine
            .distribute(&source, RoyaltyTrigger::OnCompute, Amount::new(100))
            .await
            .unwrap();
        assert!(transfers.is_empty());

        engine.reactivate_agreement(&agreement.id).await.unwrap();
        let transfers = engine
            .distribute(&source, RoyaltyTrigger::OnCompute, Amount::new(100))
            .await
            .unwrap();
        assert_eq!(transfers.len(), 1);
    }

    #[tokio::test]
    async fn triggers_are_independent() {
        let store = Arc::new(LedgerStore::new());
        let engine = RoyaltyEngine::new(store.clone());
        let source = wallet_with(&store, 100).await;
        let recipient = wallet_with(&store, 0).await;

        engine
            .create_agreement(&source, &recipient, RoyaltyRate::from_percent(10).unwrap(), RoyaltyTrigger::OnProfit)
            .await
            .unwrap();

        let transfers = engine
            .distribute(&source, RoyaltyTrigger::OnCompute, Amount::new(100))
            .await
            .unwrap();
        assert!(transfers.is_empty());
    }

    #[tokio::test]
    async fn tiny_shares_floor_to_zero_and_are_skipped() {
        let store = Arc::new(LedgerStore::new());
        let engine = RoyaltyEngine::new(store.clone());
        let source = wallet_with(&store, 100).await;
        let recipient = wallet_with(&store, 0).await;

        // 1 basis point of 100 minor units floors to zero
        engine
            .create_agreement(&source, &recipient, RoyaltyRate::from_basis_points(1).unwrap(), RoyaltyTrigger::OnProfit)
            .await
            .unwrap();

        let transfers = engine
            .distribute(&source, RoyaltyTrigger::OnProfit, Amount::new(100))
            .await
            .unwrap();
        assert!(transfers.is_empty());
        assert_eq!(store.wallet(&recipient).await.unwrap().balance, Amount::zero());
    }
}
