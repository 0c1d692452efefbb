//! Token supply conservation checker.
//!
//! Invariant checked after every scenario:
//! ```text
//! ∀ minter: Σ(wallet balances) == Σ(minted)
//! ```
//!
//! Transfers, escrow payouts and bounces move tokens between wallets but
//! must never create or destroy them.

use std::collections::HashMap;

use tonescrow_types::{Address, Coins, EscrowError, Result};

/// Tracks per-minter issued totals.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    minted: HashMap<Address, Coins>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed mint.
    pub fn record_mint(&mut self, minter: Address, amount: Coins) -> Result<()> {
        let total = self.minted.entry(minter).or_insert(Coins::ZERO);
        *total = total.checked_add(amount).ok_or(EscrowError::AmountOverflow)?;
        Ok(())
    }

    /// Total issued by `minter`.
    #[must_use]
    pub fn expected_supply(&self, minter: &Address) -> Coins {
        self.minted.get(minter).copied().unwrap_or(Coins::ZERO)
    }

    /// Verify that the sum of wallet balances matches the issued total.
    ///
    /// # Errors
    /// Returns [`EscrowError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, minter: &Address, actual_supply: Coins) -> Result<()> {
        let expected = self.expected_supply(minter);
        if actual_supply != expected {
            tracing::warn!(
                minter = %minter,
                actual = %actual_supply,
                expected = %expected,
                "Token supply invariant violated"
            );
            return Err(EscrowError::SupplyInvariantViolation {
                reason: format!(
                    "minter {minter}: wallets hold {actual_supply}, minted {expected}"
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(&Address::dummy(1)), Coins::ZERO);
        assert!(sc.verify(&Address::dummy(1), Coins::ZERO).is_ok());
    }

    #[test]
    fn mints_accumulate_per_minter() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(Address::dummy(1), Coins::from_coins(100)).unwrap();
        sc.record_mint(Address::dummy(1), Coins::from_coins(50)).unwrap();
        sc.record_mint(Address::dummy(2), Coins::from_coins(7)).unwrap();
        assert_eq!(sc.expected_supply(&Address::dummy(1)), Coins::from_coins(150));
        assert_eq!(sc.expected_supply(&Address::dummy(2)), Coins::from_coins(7));
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(Address::dummy(1), Coins::from_coins(10)).unwrap();
        assert!(sc.verify(&Address::dummy(1), Coins::from_coins(10)).is_ok());
        let err = sc
            .verify(&Address::dummy(1), Coins::from_coins(11))
            .unwrap_err();
        assert!(matches!(err, EscrowError::SupplyInvariantViolation { .. }));
    }
}
