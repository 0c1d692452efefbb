//! The escrow record: parties, locked amounts, asset mode and lifecycle.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────────┐ construct ┌────────┐ withdraw | refund ┌──────────┐
//!   │ UNINITIALIZED ├──────────▶│ ACTIVE ├──────────────────▶│ FINISHED │
//!   └───────────────┘           └────────┘                   └──────────┘
//! ```
//!
//! The lifecycle is an enum rather than two loose flags, so `finished`
//! without `initialized` cannot be represented. The [`Agreement`] is carried
//! into the `Finished` stage untouched and stays readable forever.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Address, Cell, CellBuilder, Coins, EscrowError, Result};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A party to the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Supplies the principal and the guarantor fee.
    Investor,
    /// Receives the principal on withdraw.
    Worker,
    /// Arbitrates; receives the fee on every terminal transition.
    Guarantor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Investor => write!(f, "investor"),
            Self::Worker => write!(f, "worker"),
            Self::Guarantor => write!(f, "guarantor"),
        }
    }
}

/// The role triple, fixed at construction.
///
/// Encoded in its own cell: `investor || worker || guarantor`, all present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub investor: Address,
    pub worker: Address,
    pub guarantor: Address,
}

impl Roles {
    /// Address holding `role`.
    #[must_use]
    pub fn address_of(&self, role: Role) -> Address {
        match role {
            Role::Investor => self.investor,
            Role::Worker => self.worker,
            Role::Guarantor => self.guarantor,
        }
    }

    /// Whether `caller` holds `role`. One address may hold several roles.
    #[must_use]
    pub fn holds(&self, caller: &Address, role: Role) -> bool {
        self.address_of(role) == *caller
    }

    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_address(Some(&self.investor))?;
        b.store_address(Some(&self.worker))?;
        b.store_address(Some(&self.guarantor))?;
        Ok(b.build())
    }

    /// # Errors
    /// Returns `InvalidPayload` if any of the three addresses is empty.
    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        Ok(Self {
            investor: s.load_required_address("investor")?,
            worker: s.load_required_address("worker")?,
            guarantor: s.load_required_address("guarantor")?,
        })
    }
}

// ---------------------------------------------------------------------------
// AssetMode
// ---------------------------------------------------------------------------

/// Which payment rail the escrow settles on. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AssetMode {
    /// The ledger's own coin, held as the contract balance.
    Native,
    /// A fungible token held by the escrow's own custody wallet.
    Token { wallet: Address },
}

impl AssetMode {
    /// The custody wallet, if any. `None` is how native mode goes on the wire.
    #[must_use]
    pub fn wallet(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Token { wallet } => Some(*wallet),
        }
    }

    #[must_use]
    pub fn is_token(&self) -> bool {
        matches!(self, Self::Token { .. })
    }
}

impl From<Option<Address>> for AssetMode {
    fn from(wallet: Option<Address>) -> Self {
        wallet.map_or(Self::Native, |wallet| Self::Token { wallet })
    }
}

impl fmt::Display for AssetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Token { wallet } => write!(f, "token({wallet})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Salt
// ---------------------------------------------------------------------------

/// Opaque 256-bit value that makes each instance's address unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Salt(pub [u8; 32]);

impl Salt {
    /// Fresh salt: SHA-256 of a new UUIDv7.
    #[must_use]
    pub fn random() -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"tonescrow:salt:v1:");
        hasher.update(Uuid::now_v7().as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Salt from a small integer, right-aligned big-endian.
    #[must_use]
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Agreement / Stage / EscrowState
// ---------------------------------------------------------------------------

/// The immutable terms written by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub roles: Roles,
    pub asset: AssetMode,
    /// Principal paid to the worker (withdraw) or back to the investor (refund).
    pub amount: Coins,
    /// Guarantor fee, paid on both terminal paths.
    pub amount_interest: Coins,
}

/// Lifecycle of one escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Deployed, not yet constructed.
    Uninitialized,
    /// Constructed; waiting for a withdraw or refund.
    Active(Agreement),
    /// Terminal. The agreement stays for audit; nothing moves again.
    Finished(Agreement),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "UNINITIALIZED"),
            Self::Active(_) => write!(f, "ACTIVE"),
            Self::Finished(_) => write!(f, "FINISHED"),
        }
    }
}

/// The full persisted record of an escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowState {
    pub salt: Salt,
    pub stage: Stage,
}

impl EscrowState {
    /// A freshly deployed, unconstructed instance.
    #[must_use]
    pub fn uninitialized(salt: Salt) -> Self {
        Self {
            salt,
            stage: Stage::Uninitialized,
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !matches!(self.stage, Stage::Uninitialized)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Finished(_))
    }

    /// The agreement, in any constructed stage.
    #[must_use]
    pub fn agreement(&self) -> Option<&Agreement> {
        match &self.stage {
            Stage::Uninitialized => None,
            Stage::Active(a) | Stage::Finished(a) => Some(a),
        }
    }

    /// Uninitialized → Active.
    ///
    /// # Errors
    /// Returns `ReconstructionAttempt` if the instance is already constructed.
    pub fn activate(&mut self, agreement: Agreement) -> Result<()> {
        if self.is_initialized() {
            return Err(EscrowError::ReconstructionAttempt);
        }
        self.stage = Stage::Active(agreement);
        Ok(())
    }

    /// Active → Finished.
    ///
    /// # Errors
    /// - `NotInitialized` before construction
    /// - `AlreadyFinished` after a terminal transition
    pub fn finish(&mut self) -> Result<()> {
        match self.stage {
            Stage::Uninitialized => Err(EscrowError::NotInitialized),
            Stage::Finished(_) => Err(EscrowError::AlreadyFinished),
            Stage::Active(agreement) => {
                self.stage = Stage::Finished(agreement);
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EscrowData
// ---------------------------------------------------------------------------

/// Snapshot returned by the `data` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowData {
    pub investor: Address,
    pub worker: Address,
    pub guarantor: Address,
    /// Custody wallet in token mode, `None` in native mode.
    pub wallet: Option<Address>,
    pub amount: Coins,
    pub amount_interest: Coins,
}

impl From<&Agreement> for EscrowData {
    fn from(a: &Agreement) -> Self {
        Self {
            investor: a.roles.investor,
            worker: a.roles.worker,
            guarantor: a.roles.guarantor,
            wallet: a.asset.wallet(),
            amount: a.amount,
            amount_interest: a.amount_interest,
        }
    }
}
