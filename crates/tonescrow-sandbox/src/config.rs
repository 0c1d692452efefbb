//! Ledger fee schedule and treasury funding.

use serde::{Deserialize, Serialize};
use tonescrow_types::{Coins, EscrowError, Result};

/// Fee schedule of the sandbox ledger.
///
/// Fees are flat: real ledgers price by gas and message size, but a flat
/// schedule keeps balances in tests predictable to the nano.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Charged to a code-running account for each message it executes.
    pub compute_fee: Coins,
    /// Charged to the sender for each message, on top of the value.
    pub forward_fee: Coins,
    /// Starting balance of every treasury.
    pub treasury_balance: Coins,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            compute_fee: Coins::from_nano(2_000_000),
            forward_fee: Coins::from_nano(1_000_000),
            treasury_balance: Coins::from_coins(1_000_000),
        }
    }
}

impl LedgerConfig {
    /// A fee-free ledger. Balances move by exactly the attached values.
    #[must_use]
    pub fn free() -> Self {
        Self {
            compute_fee: Coins::ZERO,
            forward_fee: Coins::ZERO,
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns `Configuration` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EscrowError::Configuration(e.to_string()))
    }
}
