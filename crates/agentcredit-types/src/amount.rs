//! Exact monetary amounts in minor units
//!
//! AgentCredit uses fixed-point arithmetic with i128 minor units (e.g.
//! cents) for all monetary values. Binary floating point never touches
//! the money path; percentage and rate application floor toward zero so
//! fractional currency is never created.

use crate::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Basis points in one whole (100%)
pub const BPS_SCALE: i128 = 10_000;

/// A monetary amount in minor units
///
/// The unit (cents, micro-credits, ...) is a deployment convention; the
/// credit layer only requires exactness. Values may be negative in
/// intermediate arithmetic (e.g. reserve deltas) but wallet fields are
/// kept non-negative by the store.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub i128);

impl Amount {
    /// Create an amount from minor units
    pub fn new(minor_units: i128) -> Self {
        Self(minor_units)
    }

    /// The zero amount
    pub fn zero() -> Self {
        Self(0)
    }

    /// Raw minor units
    pub fn minor_units(&self) -> i128 {
        self.0
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(CreditError::AmountOverflow)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(CreditError::AmountOverflow)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0).max(0))
    }

    /// Multiply by a percentage (0-100), flooring toward zero
    pub fn percentage(self, percent: u8) -> Result<Self> {
        let scaled = self
            .0
            .checked_mul(percent as i128)
            .ok_or(CreditError::AmountOverflow)?;
        Ok(Self(scaled / 100))
    }

    /// Multiply by basis points (0-10000, where 100 = 1%), flooring toward zero
    pub fn basis_points(self, bps: u32) -> Result<Self> {
        let scaled = self
            .0
            .checked_mul(bps as i128)
            .ok_or(CreditError::AmountOverflow)?;
        Ok(Self(scaled / BPS_SCALE))
    }

    /// The smaller of two amounts
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Convenience operators (panic on overflow; non-test code uses checked_*)
impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        self.checked_add(other).expect("Amount addition overflow")
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        self.checked_sub(other).expect("Amount subtraction overflow")
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| {
            Amount(acc.0.saturating_add(a.0))
        })
    }
}

impl From<i128> for Amount {
    fn from(minor_units: i128) -> Self {
        Self(minor_units)
    }
}
