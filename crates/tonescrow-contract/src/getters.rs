//! Read interface: side-effect-free queries over the persisted record.
//!
//! Both queries read the storage cell directly, so tooling can ask any
//! deployed instance without going through the dispatcher.

use serde::{Deserialize, Serialize};
use tonescrow_types::{Cell, EscrowData, EscrowError, Result};

use crate::storage;

/// Whether the terminal transition has happened. `false` before construction.
pub fn is_finished(storage: &Cell) -> Result<bool> {
    storage::load(storage).map(|s| s.is_finished())
}

/// Full snapshot of the agreement.
///
/// # Errors
/// Returns `NotInitialized` before construction.
pub fn get_data(storage: &Cell) -> Result<EscrowData> {
    let state = storage::load(storage)?;
    state
        .agreement()
        .map(EscrowData::from)
        .ok_or(EscrowError::NotInitialized)
}

/// A named get-method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GetMethod {
    Finished,
    Data,
}

impl GetMethod {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Data => "data",
        }
    }

    /// # Errors
    /// Returns `Configuration` for a name no get-method answers to.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "finished" => Ok(Self::Finished),
            "data" => Ok(Self::Data),
            other => Err(EscrowError::Configuration(format!(
                "unknown get-method {other:?}"
            ))),
        }
    }

    pub fn run(self, storage: &Cell) -> Result<GetResult> {
        match self {
            Self::Finished => is_finished(storage).map(GetResult::Finished),
            Self::Data => get_data(storage).map(GetResult::Data),
        }
    }
}

/// Result of a named get-method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GetResult {
    Finished(bool),
    Data(EscrowData),
}

#[cfg(test)]
mod tests {
    use tonescrow_types::{
        Address, Agreement, AssetMode, Coins, EscrowState, Roles, Salt, Stage,
    };

    use super::*;

    fn active() -> Cell {
        storage::store(&EscrowState {
            salt: Salt::from_u128(5),
            stage: Stage::Active(Agreement {
                roles: Roles {
                    investor: Address::dummy(1),
                    worker: Address::dummy(2),
                    guarantor: Address::dummy(3),
                },
                asset: AssetMode::Token {
                    wallet: Address::dummy(4),
                },
                amount: Coins::from_coins(100),
                amount_interest: Coins::from_coins(10),
            }),
        })
        .unwrap()
    }

    #[test]
    fn queries_on_active_instance() {
        let s = active();
        assert!(!is_finished(&s).unwrap());
        let data = get_data(&s).unwrap();
        assert_eq!(data.investor, Address::dummy(1));
        assert_eq!(data.wallet, Some(Address::dummy(4)));
        assert_eq!(data.amount, Coins::from_coins(100));
    }

    #[test]
    fn data_before_construction_is_not_initialized() {
        let s = storage::initial_data(Salt::from_u128(1)).unwrap();
        assert!(!is_finished(&s).unwrap());
        assert!(matches!(get_data(&s), Err(EscrowError::NotInitialized)));
    }

    #[test]
    fn named_methods() {
        let s = active();
        for m in [GetMethod::Finished, GetMethod::Data] {
            assert_eq!(GetMethod::from_name(m.name()).unwrap(), m);
        }
        assert_eq!(
            GetMethod::from_name("finished").unwrap().run(&s).unwrap(),
            GetResult::Finished(false)
        );
        assert!(GetMethod::from_name("balance").is_err());
    }

    #[test]
    fn data_result_serializes_with_string_amounts() {
        let result = GetMethod::Data.run(&active()).unwrap();
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["data"]["amount"], "100");
        assert_eq!(json["data"]["amount_interest"], "10");
    }
}
