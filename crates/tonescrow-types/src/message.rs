//! Message bodies: escrow actions, token transfers, and the in/out envelopes
//! the contract runtime exchanges with the ledger.
//!
//! Every body starts with a 32-bit opcode. Action bodies:
//!
//! ```text
//! construct: 0x00000001  ref(payload)
//! withdraw:  0xcb03bfaf
//! refund:    0xc135f40c
//! ```
//!
//! Construct payload cell:
//!
//! ```text
//! flags:2  ref(roles)  wallet:address-or-none  amount:coins  amount_interest:coins
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Address, AssetMode, Cell, CellBuilder, Coins, EscrowError, Result, Roles, StateInit,
    constants::{OP_CONSTRUCT, OP_REFUND, OP_TOKEN_TRANSFER, OP_WITHDRAW},
};

// ---------------------------------------------------------------------------
// ActionKind / Action
// ---------------------------------------------------------------------------

/// The three state-changing operations of the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Construct,
    Withdraw,
    Refund,
}

impl ActionKind {
    #[must_use]
    pub const fn opcode(self) -> u32 {
        match self {
            Self::Construct => OP_CONSTRUCT,
            Self::Withdraw => OP_WITHDRAW,
            Self::Refund => OP_REFUND,
        }
    }

    #[must_use]
    pub const fn from_opcode(op: u32) -> Option<Self> {
        match op {
            OP_CONSTRUCT => Some(Self::Construct),
            OP_WITHDRAW => Some(Self::Withdraw),
            OP_REFUND => Some(Self::Refund),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construct => write!(f, "construct"),
            Self::Withdraw => write!(f, "withdraw"),
            Self::Refund => write!(f, "refund"),
        }
    }
}

/// A decoded escrow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Construct(ConstructPayload),
    Withdraw,
    Refund,
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Construct(_) => ActionKind::Construct,
            Self::Withdraw => ActionKind::Withdraw,
            Self::Refund => ActionKind::Refund,
        }
    }

    pub fn encode(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_u32(self.kind().opcode())?;
        if let Self::Construct(payload) = self {
            b.store_ref(payload.to_cell()?)?;
        }
        Ok(b.build())
    }

    /// Decode an action body. Trailing data after the opcode is ignored for
    /// withdraw and refund.
    ///
    /// # Errors
    /// - `UnknownOpcode` for opcodes outside the action set
    /// - codec errors for a truncated or malformed construct payload
    pub fn decode(body: &Cell) -> Result<Self> {
        let mut s = body.parse();
        let op = s.load_u32()?;
        match ActionKind::from_opcode(op) {
            Some(ActionKind::Construct) => {
                let payload = ConstructPayload::from_cell(s.load_ref()?)?;
                Ok(Self::Construct(payload))
            }
            Some(ActionKind::Withdraw) => Ok(Self::Withdraw),
            Some(ActionKind::Refund) => Ok(Self::Refund),
            None => Err(EscrowError::UnknownOpcode(op)),
        }
    }
}

// ---------------------------------------------------------------------------
// ConstructPayload
// ---------------------------------------------------------------------------

/// Terms supplied by the construct message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructPayload {
    pub roles: Roles,
    pub asset: AssetMode,
    pub amount: Coins,
    pub amount_interest: Coins,
}

impl ConstructPayload {
    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        // initialized=1 finished=0, informational only
        b.store_bit(true)?.store_bit(false)?;
        b.store_ref(self.roles.to_cell()?)?;
        b.store_address(self.asset.wallet().as_ref())?;
        b.store_coins(self.amount)?;
        b.store_coins(self.amount_interest)?;
        Ok(b.build())
    }

    /// The two leading flag bits are skipped; the lifecycle is decided by the
    /// contract, never by the sender.
    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        s.load_bit()?;
        s.load_bit()?;
        let roles = Roles::from_cell(s.load_ref()?)?;
        let asset = AssetMode::from(s.load_address()?);
        let amount = s.load_coins()?;
        let amount_interest = s.load_coins()?;
        Ok(Self {
            roles,
            asset,
            amount,
            amount_interest,
        })
    }
}

// ---------------------------------------------------------------------------
// TokenTransfer
// ---------------------------------------------------------------------------

/// Instruction to a fungible token wallet to move tokens to another owner.
///
/// ```text
/// op:32 query_id:64 amount:coins destination:address
/// response_destination:address-or-none custom_payload:none(1)
/// forward_ton_amount:coins forward_payload:inline(1=0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub query_id: u64,
    pub amount: Coins,
    /// Owner (not wallet) address of the recipient.
    pub destination: Address,
    /// Where the wallet returns leftover value.
    pub response_destination: Option<Address>,
    /// Value forwarded to `destination` with the transfer notification.
    pub forward_ton_amount: Coins,
}

impl TokenTransfer {
    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_u32(OP_TOKEN_TRANSFER)?;
        b.store_u64(self.query_id)?;
        b.store_coins(self.amount)?;
        b.store_address(Some(&self.destination))?;
        b.store_address(self.response_destination.as_ref())?;
        b.store_bit(false)?;
        b.store_coins(self.forward_ton_amount)?;
        b.store_bit(false)?;
        Ok(b.build())
    }

    /// # Errors
    /// `InvalidPayload` if the opcode is not a transfer or a custom payload is
    /// attached, otherwise codec errors.
    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        let op = s.load_u32()?;
        if op != OP_TOKEN_TRANSFER {
            return Err(EscrowError::InvalidPayload {
                reason: format!("expected token transfer, got op {op:#010x}"),
            });
        }
        let query_id = s.load_u64()?;
        let amount = s.load_coins()?;
        let destination = s.load_required_address("destination")?;
        let response_destination = s.load_address()?;
        if s.load_bit()? {
            return Err(EscrowError::InvalidPayload {
                reason: "custom payload not supported".into(),
            });
        }
        let forward_ton_amount = s.load_coins()?;
        Ok(Self {
            query_id,
            amount,
            destination,
            response_destination,
            forward_ton_amount,
        })
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// An internal message as delivered to a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: Address,
    /// Value attached, already credited to the receiving account.
    pub value: Coins,
    /// The message is a bounce of one this account sent earlier.
    pub bounced: bool,
    pub body: Cell,
}

impl InboundMessage {
    /// Leading opcode, or `None` for an empty (comment-less top-up) body.
    #[must_use]
    pub fn op(&self) -> Option<u32> {
        self.body.parse().peek_u32().ok()
    }
}

/// A message emitted by a contract, or injected by an external wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub destination: Address,
    pub value: Coins,
    /// Return the value to the sender if delivery fails.
    pub bounce: bool,
    pub body: Cell,
    /// Deploys `destination` if it has no code yet.
    pub state_init: Option<StateInit>,
}

impl OutboundMessage {
    /// A plain value transfer with the given body.
    #[must_use]
    pub fn new(destination: Address, value: Coins, bounce: bool, body: Cell) -> Self {
        Self {
            destination,
            value,
            bounce,
            body,
            state_init: None,
        }
    }

    #[must_use]
    pub fn with_state_init(mut self, state_init: StateInit) -> Self {
        self.state_init = Some(state_init);
        self
    }

    #[must_use]
    pub fn op(&self) -> Option<u32> {
        self.body.parse().peek_u32().ok()
    }
}
