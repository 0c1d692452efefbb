//! Fixed-point coin amounts.
//!
//! Amounts are held in nano units (9 decimal places) and are limited to the
//! 120 bits the variable-length coin encoding can carry. Human-facing
//! conversions (config files, display) go through [`rust_decimal::Decimal`].

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    EscrowError, Result,
    constants::{COIN_DECIMALS, NANO_PER_COIN},
};

/// [`NANO_PER_COIN`] as a decimal.
const NANO_DECIMAL: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// An unsigned coin amount in nano units.
///
/// Serializes as a decimal string in whole-coin units (`"100.5"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Coins(u128);

impl Coins {
    /// Zero coins.
    pub const ZERO: Self = Self(0);

    /// The largest encodable amount: `2^120 - 1` nano.
    pub const MAX: Self = Self((1u128 << 120) - 1);

    /// Build an amount from raw nano units.
    #[must_use]
    pub const fn from_nano(nano: u128) -> Self {
        Self(nano)
    }

    /// Build an amount from whole coins.
    #[must_use]
    pub const fn from_coins(whole: u64) -> Self {
        Self(whole as u128 * NANO_PER_COIN)
    }

    /// Raw nano units.
    #[must_use]
    pub const fn nano(self) -> u128 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sum, or `None` if the result leaves the encodable range.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .filter(|&sum| sum <= Self::MAX.0)
            .map(Self)
    }

    /// Difference, or `None` if `other > self`.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Product with a small factor, or `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, factor: u64) -> Option<Self> {
        self.0
            .checked_mul(u128::from(factor))
            .filter(|&p| p <= Self::MAX.0)
            .map(Self)
    }

    /// Convert a whole-coin decimal (`Decimal::new(1005, 1)` = 100.5) to nano units.
    ///
    /// # Errors
    /// - `InvalidAmount` for negative values or more than 9 decimal places
    /// - `AmountOverflow` if the amount exceeds [`Coins::MAX`]
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EscrowError::InvalidAmount {
                reason: format!("negative amount {value}"),
            });
        }
        let nano = value
            .checked_mul(NANO_DECIMAL)
            .ok_or(EscrowError::AmountOverflow)?;
        if !nano.fract().is_zero() {
            return Err(EscrowError::InvalidAmount {
                reason: format!("{value} has more than {COIN_DECIMALS} decimal places"),
            });
        }
        let nano = nano.to_u128().ok_or(EscrowError::AmountOverflow)?;
        if nano > Self::MAX.0 {
            return Err(EscrowError::AmountOverflow);
        }
        Ok(Self(nano))
    }

    /// Convert to a whole-coin decimal.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the value exceeds the decimal mantissa.
    pub fn to_decimal(self) -> Result<Decimal> {
        let nano = i128::try_from(self.0).map_err(|_| EscrowError::AmountOverflow)?;
        Decimal::try_from_i128_with_scale(nano, COIN_DECIMALS)
            .map(|d| d.normalize())
            .map_err(|_| EscrowError::AmountOverflow)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANO_PER_COIN;
        let frac = self.0 % NANO_PER_COIN;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for Coins {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str(s.trim()).map_err(|e| EscrowError::InvalidAmount {
            reason: format!("{s:?}: {e}"),
        })?;
        Self::from_decimal(value)
    }
}

impl From<Coins> for String {
    fn from(coins: Coins) -> Self {
        coins.to_string()
    }
}

impl TryFrom<String> for Coins {
    type Error = EscrowError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
