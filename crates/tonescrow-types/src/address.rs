//! Account addresses and deterministic contract address derivation.
//!
//! An address is a workchain id plus the 256-bit hash of the contract's
//! initial state. Tooling derives the address of a not-yet-deployed contract
//! from its [`StateInit`] alone, which is how the investor learns where to
//! send funds before the escrow exists on the ledger.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Cell, CellBuilder, EscrowError, Result};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A standard account address, displayed in raw form `"<wc>:<hex hash>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Address {
    #[must_use]
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl FromStr for Address {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| EscrowError::InvalidAddress { reason };
        let (wc, hash_hex) = s
            .split_once(':')
            .ok_or_else(|| invalid(format!("{s:?} is not in <wc>:<hash> form")))?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|e| invalid(format!("workchain {wc:?}: {e}")))?;
        let bytes = hex::decode(hash_hex).map_err(|e| invalid(format!("hash: {e}")))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| invalid("hash must be 32 bytes".into()))?;
        Ok(Self { workchain, hash })
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = EscrowError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Random and fixed addresses for tests.
/// **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// A uniformly random basechain address.
    #[must_use]
    pub fn random() -> Self {
        Self::new(0, rand::random())
    }

    /// A fixed basechain address whose hash bytes all equal `seed`.
    #[must_use]
    pub fn dummy(seed: u8) -> Self {
        Self::new(0, [seed; 32])
    }
}

// ---------------------------------------------------------------------------
// StateInit
// ---------------------------------------------------------------------------

/// Code image plus initial data of a contract instance.
///
/// Encoded as
/// `split_depth:none(1) special:none(1) code:some(1)+ref data:some(1)+ref library:none(1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub code: Cell,
    pub data: Cell,
}

impl StateInit {
    #[must_use]
    pub fn new(code: Cell, data: Cell) -> Self {
        Self { code, data }
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_bit(false)?.store_bit(false)?;
        b.store_bit(true)?.store_ref(self.code.clone())?;
        b.store_bit(true)?.store_ref(self.data.clone())?;
        b.store_bit(false)?;
        Ok(b.build())
    }

    /// The address this state-init deploys to on `workchain`.
    pub fn address(&self, workchain: i8) -> Result<Address> {
        Ok(Address::new(workchain, self.to_cell()?.hash()))
    }
}
