//! Bond types - securitized claims on future royalty streams
//!
//! Lifecycle: active + unheld (listed) -> active + held (purchased,
//! terms frozen) -> matured (face value paid to holder) | defaulted
//! (issuer could not pay at maturity). Terms are mutable only while the
//! bond is unheld and active.

use crate::{Amount, BondId, WalletId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default purchase discount: bonds sell at 80% of face value
pub const DEFAULT_PURCHASE_PERCENT: u8 = 80;

/// Lifecycle state of a bond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    /// Listed or held, not yet matured
    Active,
    /// Face value paid to the holder
    Matured,
    /// Issuer could not pay at maturity
    Defaulted,
}

impl BondStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matured | Self::Defaulted)
    }
}

impl fmt::Display for BondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Matured => write!(f, "matured"),
            Self::Defaulted => write!(f, "defaulted"),
        }
    }
}

/// A royalty-backed bond
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    /// Unique bond ID
    pub id: BondId,
    /// Wallet that owes the face value at maturity
    pub issuer_wallet: WalletId,
    /// Current holder; `None` while listed
    pub holder_wallet: Option<WalletId>,
    /// Amount owed to the holder at maturity
    pub face_value: Amount,
    /// What the holder paid; set on purchase
    pub purchase_price: Option<Amount>,
    /// When the face value falls due
    pub maturity_date: DateTime<Utc>,
    /// Share of the issuer's royalty stream backing the bond (0..=100)
    pub royalty_percentage: u8,
    /// Lifecycle state
    pub status: BondStatus,
    /// When the bond was issued
    pub created_at: DateTime<Utc>,
}

impl Bond {
    /// Issue a new unheld, active bond
    pub fn issue(
        issuer_wallet: WalletId,
        face_value: Amount,
        royalty_percentage: u8,
        maturity_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BondId::new(),
            issuer_wallet,
            holder_wallet: None,
            face_value,
            purchase_price: None,
            maturity_date,
            royalty_percentage,
            status: BondStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Whether the bond has been purchased
    pub fn is_held(&self) -> bool {
        self.holder_wallet.is_some()
    }

    /// Whether the bond is listed for sale
    pub fn is_listed(&self) -> bool {
        self.status == BondStatus::Active && !self.is_held()
    }

    /// Whether the maturity date has been reached
    pub fn is_past_maturity(&self, now: DateTime<Utc>) -> bool {
        now >= self.maturity_date
    }

    /// Purchase price when the buyer does not name one
    pub fn default_purchase_price(&self) -> Amount {
        // face_value is validated positive at issue; 80% of it cannot overflow
        self.face_value
            .percentage(DEFAULT_PURCHASE_PERCENT)
            .unwrap_or(self.face_value)
    }
}

/// Partial update of an unheld bond's terms; each field is validated
/// independently
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondTermsUpdate {
    /// New face value (must be positive)
    pub face_value: Option<Amount>,
    /// New royalty percentage (0..=100)
    pub royalty_percentage: Option<u8>,
    /// New maturity date (must be in the future)
    pub maturity_date: Option<DateTime<Utc>>,
}
