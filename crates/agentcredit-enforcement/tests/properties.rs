//! Property tests for balance conservation and lien settlement order

use std::sync::Arc;

use proptest::prelude::*;

use agentcredit_store::LedgerStore;
use agentcredit_types::{AgentId, Amount, TransferKind, Wallet, WalletId};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

async fn funded_wallet(store: &LedgerStore, amount: i128) -> WalletId {
    let wallet = store.insert_wallet(Wallet::new(AgentId::new())).await.unwrap();
    if amount > 0 {
        store
            .apply_deposit(&wallet.id, Amount::new(amount), "seed")
            .await
            .unwrap();
    }
    wallet.id
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Internal transfers conserve total system balance no matter which
    /// succeed and which bounce off the affordability check.
    #[test]
    fn transfers_conserve_total_balance(
        seeds in prop::collection::vec(0i128..10_000, 2..6),
        moves in prop::collection::vec((0usize..6, 0usize..6, 1i128..5_000), 1..32),
    ) {
        runtime().block_on(async move {
            let store = Arc::new(LedgerStore::new());
            let mut wallets = Vec::new();
            let mut total = 0i128;
            for seed in &seeds {
                wallets.push(funded_wallet(&store, *seed).await);
                total += seed;
            }

            for (from, to, amount) in moves {
                let from = wallets[from % wallets.len()];
                let to = wallets[to % wallets.len()];
                if from == to {
                    continue;
                }
                let _guards = store.lock_wallet_pair(&from, &to).await;
                // Failures are fine; they must not move money either
                let _ = store
                    .apply_transfer(&from, &to, Amount::new(amount), "move", TransferKind::Direct)
                    .await;
            }

            let after: i128 = store
                .all_wallets()
                .await
                .iter()
                .map(|w| w.balance.minor_units())
                .sum();
            prop_assert_eq!(after, total);

            for wallet in store.all_wallets().await {
                prop_assert!(!wallet.balance.is_negative());
            }
            Ok(())
        })?;
    }

    /// A deposit-driven settlement walk pays liens in ascending priority
    /// and never settles one past an unaffordable predecessor.
    #[test]
    fn lien_walk_respects_priority_order(
        lien_amounts in prop::collection::vec(1i128..500, 1..8),
        deposit in 1i128..2_000,
    ) {
        runtime().block_on(async move {
            let store = Arc::new(LedgerStore::new());
            let liens = agentcredit_liens::LienManager::new(store.clone());
            let debtor = funded_wallet(&store, 0).await;
            let creditor = funded_wallet(&store, 0).await;

            let mut created = Vec::new();
            for (i, amount) in lien_amounts.iter().enumerate() {
                let lien = liens
                    .create_lien(&debtor, &creditor, Amount::new(*amount), "debt", i as u32)
                    .await
                    .unwrap();
                created.push(lien);
            }

            store
                .apply_deposit(&debtor, Amount::new(deposit), "deposit")
                .await
                .unwrap();
            let settled = liens.auto_settle_on_deposit(&debtor).await.unwrap();

            // The walk settles exactly the longest affordable prefix
            let mut remaining = deposit;
            let mut expected = 0usize;
            for amount in &lien_amounts {
                if remaining < *amount {
                    break;
                }
                remaining -= amount;
                expected += 1;
            }
            prop_assert_eq!(settled.len(), expected);

            for (lien, was_settled) in created
                .iter()
                .zip((0..created.len()).map(|i| i < expected))
            {
                let current = store.lien(&lien.id).await.unwrap();
                prop_assert_eq!(current.is_settled(), was_settled);
            }

            let wallet = store.wallet(&debtor).await.unwrap();
            prop_assert_eq!(wallet.balance.minor_units(), remaining);
            Ok(())
        })?;
    }
}
