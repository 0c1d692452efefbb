//! The escrow code image.
//!
//! A code cell identifies the program a ledger account runs. The escrow image
//! is a fixed tag followed by the gas thresholds the program enforces:
//!
//! ```text
//! tag:"tonescrow:escrow:v1"  gas_reserve:coins  action_gas:coins  token_transfer_value:coins
//! ```
//!
//! Because the thresholds live in the code cell, they take part in address
//! derivation: two gas configurations never share an address.

use tonescrow_types::{Cell, CellBuilder, EscrowError, GasConfig, Result};

/// Tag prefixing every escrow code image.
pub const ESCROW_CODE_TAG: &[u8] = b"tonescrow:escrow:v1";

/// A decoded escrow code image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscrowCode {
    pub gas: GasConfig,
}

impl EscrowCode {
    #[must_use]
    pub fn new(gas: GasConfig) -> Self {
        Self { gas }
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_bytes(ESCROW_CODE_TAG)?;
        b.store_coins(self.gas.gas_reserve)?;
        b.store_coins(self.gas.action_gas)?;
        b.store_coins(self.gas.token_transfer_value)?;
        Ok(b.build())
    }

    /// # Errors
    /// Returns `UnknownCode` if the cell does not carry the escrow tag.
    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        let tag = s.load_bytes::<19>().map_err(|_| EscrowError::UnknownCode {
            reason: "code cell too short for escrow tag".into(),
        })?;
        if tag.as_slice() != ESCROW_CODE_TAG {
            return Err(EscrowError::UnknownCode {
                reason: format!("unexpected tag {}", hex::encode(tag)),
            });
        }
        let gas = GasConfig {
            gas_reserve: s.load_coins()?,
            action_gas: s.load_coins()?,
            token_transfer_value: s.load_coins()?,
        };
        Ok(Self { gas })
    }

    /// Whether `cell` is an escrow code image.
    #[must_use]
    pub fn is_escrow_code(cell: &Cell) -> bool {
        Self::from_cell(cell).is_ok()
    }
}
