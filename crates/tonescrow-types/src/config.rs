//! Gas parameters and the declarative description of one escrow deal.

use serde::{Deserialize, Serialize};

use crate::{
    Address, AssetMode, Coins, ConstructPayload, EscrowError, Result, Roles,
    constants::{
        DEFAULT_ACTION_GAS_NANO, DEFAULT_GAS_RESERVE_NANO, DEFAULT_TOKEN_TRANSFER_VALUE_NANO,
    },
};

// ---------------------------------------------------------------------------
// GasConfig
// ---------------------------------------------------------------------------

/// Value the contract demands on top of escrowed amounts.
///
/// Baked into the code image, so every instance built from the same code
/// enforces the same thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Kept on the contract at construction to pay for later execution.
    pub gas_reserve: Coins,
    /// Minimum attached to a withdraw or refund.
    pub action_gas: Coins,
    /// Attached to each outgoing token transfer instruction.
    pub token_transfer_value: Coins,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            gas_reserve: Coins::from_nano(DEFAULT_GAS_RESERVE_NANO),
            action_gas: Coins::from_nano(DEFAULT_ACTION_GAS_NANO),
            token_transfer_value: Coins::from_nano(DEFAULT_TOKEN_TRANSFER_VALUE_NANO),
        }
    }
}

impl GasConfig {
    /// Minimum value a construct message must carry.
    ///
    /// Native mode escrows the principal and fee in the contract balance, so
    /// they are part of the requirement. Token mode funds arrive separately in
    /// the custody wallet.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the sum leaves the coin range.
    pub fn construct_requirement(
        &self,
        asset: &AssetMode,
        amount: Coins,
        amount_interest: Coins,
    ) -> Result<Coins> {
        match asset {
            AssetMode::Native => amount
                .checked_add(amount_interest)
                .and_then(|sum| sum.checked_add(self.gas_reserve))
                .ok_or(EscrowError::AmountOverflow),
            AssetMode::Token { .. } => Ok(self.gas_reserve),
        }
    }

    /// Minimum value a withdraw or refund must carry.
    ///
    /// Token mode pays for two wallet instructions (principal and fee).
    pub fn action_requirement(&self, asset: &AssetMode) -> Result<Coins> {
        match asset {
            AssetMode::Native => Ok(self.action_gas),
            AssetMode::Token { .. } => self
                .token_transfer_value
                .checked_mul(2)
                .and_then(|v| v.checked_add(self.action_gas))
                .ok_or(EscrowError::AmountOverflow),
        }
    }
}

// ---------------------------------------------------------------------------
// EscrowConfig
// ---------------------------------------------------------------------------

/// A deal as written by whoever sets the escrow up (usually the investor).
///
/// ```json
/// {
///   "investor": "0:…", "worker": "0:…", "guarantor": "0:…",
///   "amount": "100", "amount_interest": "10",
///   "wallet": null
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    pub investor: Address,
    pub worker: Address,
    pub guarantor: Address,
    pub amount: Coins,
    pub amount_interest: Coins,
    /// Custody token wallet of the escrow; absent for native escrows.
    #[serde(default)]
    pub wallet: Option<Address>,
}

impl EscrowConfig {
    /// Parse from JSON.
    ///
    /// # Errors
    /// Returns `Configuration` if the document is malformed or an address or
    /// amount fails to parse.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EscrowError::Configuration(e.to_string()))
    }

    #[must_use]
    pub fn roles(&self) -> Roles {
        Roles {
            investor: self.investor,
            worker: self.worker,
            guarantor: self.guarantor,
        }
    }

    #[must_use]
    pub fn asset(&self) -> AssetMode {
        AssetMode::from(self.wallet)
    }

    /// The construct payload describing this deal.
    #[must_use]
    pub fn payload(&self) -> ConstructPayload {
        ConstructPayload {
            roles: self.roles(),
            asset: self.asset(),
            amount: self.amount,
            amount_interest: self.amount_interest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_construct_requirement_includes_escrowed_sum() {
        let gas = GasConfig::default();
        let req = gas
            .construct_requirement(&AssetMode::Native, Coins::from_coins(100), Coins::from_coins(10))
            .unwrap();
        assert_eq!(req.to_string(), "110.01");
    }

    #[test]
    fn token_construct_requirement_is_gas_only() {
        let gas = GasConfig::default();
        let asset = AssetMode::Token {
            wallet: Address::dummy(5),
        };
        let req = gas
            .construct_requirement(&asset, Coins::from_coins(100), Coins::from_coins(10))
            .unwrap();
        assert_eq!(req, gas.gas_reserve);
    }

    #[test]
    fn action_requirements() {
        let gas = GasConfig::default();
        assert_eq!(gas.action_requirement(&AssetMode::Native).unwrap().to_string(), "0.01");
        let asset = AssetMode::Token {
            wallet: Address::dummy(5),
        };
        assert_eq!(gas.action_requirement(&asset).unwrap().to_string(), "0.11");
    }

    #[test]
    fn construct_requirement_overflow() {
        let gas = GasConfig::default();
        assert!(matches!(
            gas.construct_requirement(&AssetMode::Native, Coins::MAX, Coins::ZERO),
            Err(EscrowError::AmountOverflow)
        ));
    }

    #[test]
    fn escrow_config_from_json() {
        let json = format!(
            r#"{{"investor":"{}","worker":"{}","guarantor":"{}","amount":"100","amount_interest":"0.5"}}"#,
            Address::dummy(1),
            Address::dummy(2),
            Address::dummy(3)
        );
        let cfg = EscrowConfig::from_json(&json).unwrap();
        assert_eq!(cfg.asset(), AssetMode::Native);
        assert_eq!(cfg.amount_interest, Coins::from_nano(500_000_000));
        assert_eq!(cfg.payload().roles.worker, Address::dummy(2));
    }

    #[test]
    fn escrow_config_rejects_bad_address() {
        let json = r#"{"investor":"nope","worker":"0:00","guarantor":"0:00","amount":"1","amount_interest":"0"}"#;
        assert!(matches!(
            EscrowConfig::from_json(json),
            Err(EscrowError::Configuration(_))
        ));
    }
}
