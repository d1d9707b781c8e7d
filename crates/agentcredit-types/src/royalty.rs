//! Royalty agreement types
//!
//! A royalty agreement is a standing rule that splits a share of gross
//! proceeds to a recipient whenever a named trigger fires. Rates are
//! stored in basis points so share computation stays in exact integer
//! arithmetic; shares floor toward zero.

use crate::{AgreementId, Amount, CreditError, Result, WalletId, BPS_SCALE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event that fires a royalty distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoyaltyTrigger {
    /// Compute spend by the source wallet
    OnCompute,
    /// Savings generated by the source agent
    OnSavings,
    /// Realized profit of the source agent
    OnProfit,
}

impl fmt::Display for RoyaltyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnCompute => write!(f, "on_compute"),
            Self::OnSavings => write!(f, "on_savings"),
            Self::OnProfit => write!(f, "on_profit"),
        }
    }
}

/// A royalty rate in basis points (0..=10000, where 10000 = 100%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoyaltyRate(u32);

impl RoyaltyRate {
    /// Create a rate from basis points; rejects values above 100%
    pub fn from_basis_points(bps: u32) -> Result<Self> {
        if bps as i128 > BPS_SCALE {
            return Err(CreditError::invalid_amount(
                "rate",
                format!("{} basis points exceeds 100%", bps),
            ));
        }
        Ok(Self(bps))
    }

    /// Create a rate from a whole percentage (0..=100)
    pub fn from_percent(percent: u8) -> Result<Self> {
        if percent > 100 {
            return Err(CreditError::invalid_amount(
                "rate",
                format!("{}% exceeds 100%", percent),
            ));
        }
        Ok(Self(percent as u32 * 100))
    }

    /// The rate in basis points
    pub fn basis_points(&self) -> u32 {
        self.0
    }

    /// Apply the rate to a gross amount, flooring toward zero
    pub fn share_of(&self, gross: Amount) -> Result<Amount> {
        gross.basis_points(self.0)
    }
}

impl fmt::Display for RoyaltyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// A standing royalty split rule
///
/// Multiple agreements may share a `(source_wallet, trigger)` pair; all
/// active ones fire together on `distribute`. Their rates are *not*
/// forced to sum to 100% or less - over-committing is the caller's
/// responsibility and surfaces as an aggregate affordability failure at
/// distribution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyAgreement {
    /// Unique agreement ID
    pub id: AgreementId,
    /// Wallet whose proceeds are split
    pub source_wallet: WalletId,
    /// Wallet receiving the share
    pub recipient_wallet: WalletId,
    /// Share of gross proceeds
    pub rate: RoyaltyRate,
    /// Event that fires the split
    pub trigger: RoyaltyTrigger,
    /// Inactive agreements never fire
    pub active: bool,
    /// When the agreement was created
    pub created_at: DateTime<Utc>,
}

impl RoyaltyAgreement {
    /// Create an active agreement
    pub fn new(
        source_wallet: WalletId,
        recipient_wallet: WalletId,
        rate: RoyaltyRate,
        trigger: RoyaltyTrigger,
    ) -> Self {
        Self {
            id: AgreementId::new(),
            source_wallet,
            recipient_wallet,
            rate,
            trigger,
            active: true,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_bounds() {
        assert!(RoyaltyRate::from_basis_points(10_000).is_ok());
        assert!(RoyaltyRate::from_basis_points(10_001).is_err());
        assert!(RoyaltyRate::from_percent(100).is_ok());
        assert!(RoyaltyRate::from_percent(101).is_err());
    }

    #[test]
    fn test_share_floors() {
        let rate = RoyaltyRate::from_percent(10).unwrap();
        // 10% of 99 = 9.9 -> 9
        assert_eq!(rate.share_of(Amount::new(99)).unwrap(), Amount::new(9));
    }

    #[test]
    fn test_rate_display() {
        let rate = RoyaltyRate::from_basis_points(1250).unwrap();
        assert_eq!(rate.to_string(), "12.50%");
    }
}
