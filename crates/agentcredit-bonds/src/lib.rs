//! AgentCredit Bond Market - royalty-backed bonds
//!
//! An issuer lists a bond against its future royalty stream; a buyer
//! purchases it at a discount (80% of face by default) and collects the
//! face value at maturity. An issuer that cannot pay at maturity
//! defaults; a defaulted bond is a write-off for the holder, there is
//! no further collection.
//!
//! Purchase and maturity are serialized on the issuer's wallet lock with
//! a fresh bond re-read inside the critical section, so two buyers
//! racing for the same listing cannot both pay.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use agentcredit_store::LedgerStore;
use agentcredit_types::{
    Amount, Bond, BondId, BondStatus, BondTermsUpdate, CreditError, Result, Transfer,
    TransferKind, WalletId,
};

/// The Bond Market service
#[derive(Clone)]
pub struct BondMarket {
    store: Arc<LedgerStore>,
}

impl BondMarket {
    /// Create a bond market over a shared store
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// List a new bond against the issuer's royalty stream
    pub async fn issue(
        &self,
        issuer: &WalletId,
        face_value: Amount,
        royalty_percentage: u8,
        maturity_days: i64,
    ) -> Result<Bond> {
        if !face_value.is_positive() {
            return Err(CreditError::invalid_amount(
                "face_value",
                "must be positive",
            ));
        }
        if royalty_percentage > 100 {
            return Err(CreditError::invalid_amount(
                "royalty_percentage",
                format!("{}% exceeds 100%", royalty_percentage),
            ));
        }
        if maturity_days <= 0 {
            return Err(CreditError::invalid_amount(
                "maturity_days",
                "must be at least one day",
            ));
        }

        let maturity_date = Utc::now() + Duration::days(maturity_days);
        let bond = self
            .store
            .insert_bond(Bond::issue(*issuer, face_value, royalty_percentage, maturity_date))
            .await?;
        info!(
            bond = %bond.id,
            %issuer,
            face = %face_value,
            royalty_percentage,
            maturity = %maturity_date,
            "bond issued"
        );
        Ok(bond)
    }

    /// Buy a listed bond, paying the issuer
    ///
    /// The price defaults to 80% of face value when the buyer does not
    /// name an offer.
    pub async fn purchase(
        &self,
        bond_id: &BondId,
        buyer: &WalletId,
        offer_price: Option<Amount>,
    ) -> Result<(Bond, Transfer)> {
        if let Some(price) = offer_price {
            if !price.is_positive() {
                return Err(CreditError::invalid_amount(
                    "offer_price",
                    "must be positive",
                ));
            }
        }

        let listed = self.store.bond(bond_id).await?;
        let _guards = self
            .store
            .lock_wallet_pair(buyer, &listed.issuer_wallet)
            .await;

        // Re-read inside the critical section; a racing buyer may have
        // won the listing while we waited for the locks.
        let bond = self.store.bond(bond_id).await?;
        if bond.status.is_terminal() {
            return Err(CreditError::BondAlreadyMatured {
                bond_id: bond_id.to_string(),
                status: bond.status.to_string(),
            });
        }
        if bond.is_held() {
            return Err(CreditError::BondAlreadyPurchased {
                bond_id: bond_id.to_string(),
            });
        }
        if &bond.issuer_wallet == buyer {
            return Err(CreditError::SelfPurchase {
                bond_id: bond_id.to_string(),
                wallet_id: buyer.to_string(),
            });
        }

        let price = offer_price.unwrap_or_else(|| bond.default_purchase_price());
        let (_, _, transfer) = self
            .store
            .apply_transfer(
                buyer,
                &bond.issuer_wallet,
                price,
                &format!("bond purchase: {}", bond_id),
                TransferKind::Direct,
            )
            .await?;
        let bond = self.store.set_bond_holder(bond_id, *buyer, price).await?;

        info!(bond = %bond_id, %buyer, %price, "bond purchased");
        Ok((bond, transfer))
    }

    /// Collect the face value of a held bond at or past maturity
    ///
    /// An issuer that cannot cover the face value defaults: the bond
    /// transitions to `Defaulted` and the holder takes the write-off.
    pub async fn mature(&self, bond_id: &BondId) -> Result<(Bond, Transfer)> {
        let snapshot = self.store.bond(bond_id).await?;
        let holder = snapshot.holder_wallet.ok_or_else(|| CreditError::BondNotHeld {
            bond_id: bond_id.to_string(),
        })?;

        let _guards = self
            .store
            .lock_wallet_pair(&snapshot.issuer_wallet, &holder)
            .await;

        let bond = self.store.bond(bond_id).await?;
        if bond.status.is_terminal() {
            return Err(CreditError::BondAlreadyMatured {
                bond_id: bond_id.to_string(),
                status: bond.status.to_string(),
            });
        }
        let holder = bond.holder_wallet.ok_or_else(|| CreditError::BondNotHeld {
            bond_id: bond_id.to_string(),
        })?;
        if !bond.is_past_maturity(Utc::now()) {
            return Err(CreditError::BondNotMatured {
                bond_id: bond_id.to_string(),
                maturity_date: bond.maturity_date.to_rfc3339(),
            });
        }

        match self
            .store
            .apply_transfer(
                &bond.issuer_wallet,
                &holder,
                bond.face_value,
                &format!("bond maturity: {}", bond_id),
                TransferKind::Direct,
            )
            .await
        {
            Ok((_, _, transfer)) => {
                let bond = self.store.set_bond_status(bond_id, BondStatus::Matured).await?;
                info!(bond = %bond_id, face = %bond.face_value, "bond matured");
                Ok((bond, transfer))
            }
            Err(CreditError::InsufficientFunds { .. }) => {
                self.store
                    .set_bond_status(bond_id, BondStatus::Defaulted)
                    .await?;
                warn!(
                    bond = %bond_id,
                    issuer = %bond.issuer_wallet,
                    face = %bond.face_value,
                    "bond defaulted at maturity"
                );
                Err(CreditError::BondDefaulted {
                    bond_id: bond_id.to_string(),
                    issuer_wallet: bond.issuer_wallet.to_string(),
                    face_value: bond.face_value.minor_units(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Sweep every held bond at or past maturity, attempting collection
    ///
    /// Bonds whose issuer can pay mature normally; the rest default.
    /// Returns the ids of the bonds that defaulted in this sweep.
    pub async fn check_defaults(&self) -> Result<Vec<BondId>> {
        let due = self.store.held_bonds_past_maturity(Utc::now()).await;
        let mut defaulted = Vec::new();

        for bond in due {
            match self.mature(&bond.id).await {
                Ok(_) => {}
                Err(CreditError::BondDefaulted { .. }) => defaulted.push(bond.id),
                // Raced with a direct mature call
                Err(CreditError::BondAlreadyMatured { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        if !defaulted.is_empty() {
            warn!(count = defaulted.len(), "bonds defaulted in sweep");
        }
        Ok(defaulted)
    }

    /// Delist an unheld bond
    pub async fn cancel(&self, bond_id: &BondId) -> Result<Bond> {
        let snapshot = self.store.bond(bond_id).await?;
        let _guard = self.store.lock_wallet(&snapshot.issuer_wallet).await;

        let bond = self.store.bond(bond_id).await?;
        if bond.status.is_terminal() {
            return Err(CreditError::BondAlreadyMatured {
                bond_id: bond_id.to_string(),
                status: bond.status.to_string(),
            });
        }
        if bond.is_held() {
            return Err(CreditError::BondAlreadyPurchased {
                bond_id: bond_id.to_string(),
            });
        }

        let removed = self.store.remove_bond(bond_id).await?;
        info!(bond = %bond_id, "bond cancelled");
        Ok(removed)
    }

    /// Amend the terms of an unheld, active bond
    pub async fn update_terms(&self, bond_id: &BondId, update: BondTermsUpdate) -> Result<Bond> {
        if let Some(face_value) = update.face_value {
            if !face_value.is_positive() {
                return Err(CreditError::invalid_amount(
                    "face_value",
                    "must be positive",
                ));
            }
        }
        if let Some(pct) = update.royalty_percentage {
            if pct > 100 {
                return Err(CreditError::invalid_amount(
                    "royalty_percentage",
                    format!("{}% exceeds 100%", pct),
                ));
            }
        }
        if let Some(date) = update.maturity_date {
            if date <= Utc::now() {
                return Err(CreditError::invalid_amount(
                    "maturity_date",
                    "must be in the future",
                ));
            }
        }

        let snapshot = self.store.bond(bond_id).await?;
        let _guard = self.store.lock_wallet(&snapshot.issuer_wallet).await;

        let bond = self.store.bond(bond_id).await?;
        if bond.status.is_terminal() {
            return Err(CreditError::BondAlreadyMatured {
                bond_id: bond_id.to_string(),
                status: bond.status.to_string(),
            });
        }
        if bond.is_held() {
            // Terms freeze at purchase
            return Err(CreditError::BondAlreadyPurchased {
                bond_id: bond_id.to_string(),
            });
        }

        let bond = self.store.update_bond_terms(bond_id, &update).await?;
        info!(bond = %bond_id, "bond terms updated");
        Ok(bond)
    }

    /// Fetch a bond snapshot
    pub async fn bond(&self, bond_id: &BondId) -> Result<Bond> {
        self.store.bond(bond_id).await
    }

    /// Every bond issued by a wallet, in any state
    pub async fn bonds_issued_by(&self, issuer: &WalletId) -> Vec<Bond> {
        self.store.bonds_issued_by(issuer).await
    }

    /// Active, unheld bonds open for purchase
    pub async fn listed_bonds(&self) -> Vec<Bond> {
        self.store.listed_bonds().await
    }
}
