//! Fungible token minter and wallet programs.
//!
//! Follows the standard minter/wallet split: every owner holds tokens in a
//! separate wallet contract whose address is derived from `(minter, owner)`.
//!
//! ```text
//! owner ──transfer──▶ owner wallet ──internal_transfer──▶ recipient wallet
//!                                                          ├─notification──▶ recipient (if forward value)
//!                                                          └─excesses──────▶ response destination
//! ```
//!
//! Each wallet hop keeps [`WALLET_GAS`] of the attached value to pay for its
//! own execution and forwards the rest.

use tonescrow_contract::Execution;
use tonescrow_types::{
    Address, Cell, CellBuilder, Coins, EscrowError, InboundMessage, OutboundMessage, Result,
    StateInit, TokenTransfer,
    constants::{
        BASECHAIN, OP_TOKEN_EXCESSES, OP_TOKEN_INTERNAL_TRANSFER, OP_TOKEN_MINT,
        OP_TOKEN_TRANSFER, OP_TOKEN_TRANSFER_NOTIFICATION,
    },
};

/// Tag of the minter code image.
pub const MINTER_CODE_TAG: &[u8] = b"tonescrow:minter:v1";

/// Tag of the wallet code image.
pub const WALLET_CODE_TAG: &[u8] = b"tonescrow:wallet:v1";

/// Value each wallet hop retains for its own execution.
pub const WALLET_GAS: Coins = Coins::from_nano(10_000_000);

fn tagged_code(tag: &[u8]) -> Result<Cell> {
    let mut b = CellBuilder::new();
    b.store_bytes(tag)?;
    Ok(b.build())
}

fn has_tag(code: &Cell, tag: &[u8]) -> bool {
    code.parse()
        .load_bytes::<19>()
        .is_ok_and(|t| t.as_slice() == tag)
}

pub fn minter_code() -> Result<Cell> {
    tagged_code(MINTER_CODE_TAG)
}

pub fn wallet_code() -> Result<Cell> {
    tagged_code(WALLET_CODE_TAG)
}

#[must_use]
pub fn is_minter_code(code: &Cell) -> bool {
    has_tag(code, MINTER_CODE_TAG)
}

#[must_use]
pub fn is_wallet_code(code: &Cell) -> bool {
    has_tag(code, WALLET_CODE_TAG)
}

// ---------------------------------------------------------------------------
// Persisted data
// ---------------------------------------------------------------------------

/// Minter storage: `admin:address total_supply:coins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinterData {
    pub admin: Address,
    pub total_supply: Coins,
}

impl MinterData {
    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_address(Some(&self.admin))?;
        b.store_coins(self.total_supply)?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        Ok(Self {
            admin: s.load_required_address("admin")?,
            total_supply: s.load_coins()?,
        })
    }
}

/// Wallet storage: `balance:coins owner:address minter:address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletData {
    pub balance: Coins,
    pub owner: Address,
    pub minter: Address,
}

impl WalletData {
    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_coins(self.balance)?;
        b.store_address(Some(&self.owner))?;
        b.store_address(Some(&self.minter))?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        Ok(Self {
            balance: s.load_coins()?,
            owner: s.load_required_address("owner")?,
            minter: s.load_required_address("minter")?,
        })
    }
}

/// State-init of the (empty) wallet of `owner` under `minter`.
pub fn wallet_state_init(minter: Address, owner: Address) -> Result<StateInit> {
    let data = WalletData {
        balance: Coins::ZERO,
        owner,
        minter,
    };
    Ok(StateInit::new(wallet_code()?, data.to_cell()?))
}

/// Deterministic wallet address of `owner` under `minter`.
pub fn wallet_address(minter: Address, owner: Address) -> Result<Address> {
    wallet_state_init(minter, owner)?.address(BASECHAIN)
}

// ---------------------------------------------------------------------------
// Message bodies
// ---------------------------------------------------------------------------

/// Wallet-to-wallet credit.
///
/// `op query_id:64 amount:coins from:address response_destination:address-or-none
/// forward_ton_amount:coins forward_payload:inline(1=0)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalTransfer {
    pub query_id: u64,
    pub amount: Coins,
    /// Owner the tokens come from (the minter itself for mints).
    pub from: Address,
    pub response_destination: Option<Address>,
    pub forward_ton_amount: Coins,
}

impl InternalTransfer {
    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_u32(OP_TOKEN_INTERNAL_TRANSFER)?;
        b.store_u64(self.query_id)?;
        b.store_coins(self.amount)?;
        b.store_address(Some(&self.from))?;
        b.store_address(self.response_destination.as_ref())?;
        b.store_coins(self.forward_ton_amount)?;
        b.store_bit(false)?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        s.load_u32()?;
        Ok(Self {
            query_id: s.load_u64()?,
            amount: s.load_coins()?,
            from: s.load_required_address("from")?,
            response_destination: s.load_address()?,
            forward_ton_amount: s.load_coins()?,
        })
    }
}

/// Minter instruction: `op query_id:64 to_owner:address amount:coins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mint {
    pub query_id: u64,
    pub to_owner: Address,
    pub amount: Coins,
}

impl Mint {
    pub fn to_cell(&self) -> Result<Cell> {
        let mut b = CellBuilder::new();
        b.store_u32(OP_TOKEN_MINT)?;
        b.store_u64(self.query_id)?;
        b.store_address(Some(&self.to_owner))?;
        b.store_coins(self.amount)?;
        Ok(b.build())
    }

    pub fn from_cell(cell: &Cell) -> Result<Self> {
        let mut s = cell.parse();
        s.load_u32()?;
        Ok(Self {
            query_id: s.load_u64()?,
            to_owner: s.load_required_address("to_owner")?,
            amount: s.load_coins()?,
        })
    }
}

fn notification_body(query_id: u64, amount: Coins, from: Address) -> Result<Cell> {
    let mut b = CellBuilder::new();
    b.store_u32(OP_TOKEN_TRANSFER_NOTIFICATION)?;
    b.store_u64(query_id)?;
    b.store_coins(amount)?;
    b.store_address(Some(&from))?;
    b.store_bit(false)?;
    Ok(b.build())
}

fn excesses_body(query_id: u64) -> Result<Cell> {
    let mut b = CellBuilder::new();
    b.store_u32(OP_TOKEN_EXCESSES)?;
    b.store_u64(query_id)?;
    Ok(b.build())
}

fn ensure_value(attached: Coins, required: Coins) -> Result<()> {
    if attached < required {
        return Err(EscrowError::InsufficientValue { required, attached });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Minter program
// ---------------------------------------------------------------------------

/// Accepts mint instructions from its admin and credits the owner's wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinterProgram;

impl MinterProgram {
    pub fn receive(&self, own: Address, data: &Cell, msg: &InboundMessage) -> Result<Execution> {
        let mut state = MinterData::from_cell(data)?;
        if msg.bounced {
            // A mint that failed downstream never reached a wallet.
            if msg.op() == Some(OP_TOKEN_INTERNAL_TRANSFER) {
                let t = InternalTransfer::from_cell(&msg.body)?;
                state.total_supply = state.total_supply.saturating_sub(t.amount);
            }
            return Ok(Execution {
                storage: state.to_cell()?,
                messages: Vec::new(),
            });
        }
        match msg.op() {
            None => Ok(Execution {
                storage: data.clone(),
                messages: Vec::new(),
            }),
            Some(OP_TOKEN_MINT) => {
                if msg.sender != state.admin {
                    return Err(EscrowError::TokenSenderUnauthorized(msg.sender));
                }
                let mint = Mint::from_cell(&msg.body)?;
                let required = WALLET_GAS
                    .checked_mul(2)
                    .ok_or(EscrowError::AmountOverflow)?;
                ensure_value(msg.value, required)?;
                state.total_supply = state
                    .total_supply
                    .checked_add(mint.amount)
                    .ok_or(EscrowError::AmountOverflow)?;

                let body = InternalTransfer {
                    query_id: mint.query_id,
                    amount: mint.amount,
                    from: own,
                    response_destination: Some(state.admin),
                    forward_ton_amount: Coins::ZERO,
                }
                .to_cell()?;
                let si = wallet_state_init(own, mint.to_owner)?;
                let dest = si.address(BASECHAIN)?;
                tracing::debug!(owner = %mint.to_owner, amount = %mint.amount, "Tokens minted");
                Ok(Execution {
                    storage: state.to_cell()?,
                    messages: vec![
                        OutboundMessage::new(dest, msg.value.saturating_sub(WALLET_GAS), true, body)
                            .with_state_init(si),
                    ],
                })
            }
            Some(op) => Err(EscrowError::UnknownOpcode(op)),
        }
    }
}

// ---------------------------------------------------------------------------
// Wallet program
// ---------------------------------------------------------------------------

/// Holds one owner's balance of one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletProgram;

impl WalletProgram {
    pub fn receive(&self, data: &Cell, msg: &InboundMessage) -> Result<Execution> {
        let mut state = WalletData::from_cell(data)?;

        if msg.bounced {
            // Our internal transfer failed: take the tokens back.
            if msg.op() == Some(OP_TOKEN_INTERNAL_TRANSFER) {
                let t = InternalTransfer::from_cell(&msg.body)?;
                state.balance = state
                    .balance
                    .checked_add(t.amount)
                    .ok_or(EscrowError::AmountOverflow)?;
                tracing::warn!(
                    owner = %state.owner,
                    amount = %t.amount,
                    "Token transfer bounced; balance restored"
                );
            }
            return Ok(Execution {
                storage: state.to_cell()?,
                messages: Vec::new(),
            });
        }

        let messages = match msg.op() {
            None => Vec::new(),
            Some(OP_TOKEN_TRANSFER) => Self::transfer(&mut state, msg)?,
            Some(OP_TOKEN_INTERNAL_TRANSFER) => Self::internal_transfer(&mut state, msg)?,
            Some(op) => return Err(EscrowError::UnknownOpcode(op)),
        };
        Ok(Execution {
            storage: state.to_cell()?,
            messages,
        })
    }

    fn transfer(state: &mut WalletData, msg: &InboundMessage) -> Result<Vec<OutboundMessage>> {
        if msg.sender != state.owner {
            return Err(EscrowError::TokenSenderUnauthorized(msg.sender));
        }
        let req = TokenTransfer::from_cell(&msg.body)?;
        let required = WALLET_GAS
            .checked_mul(2)
            .and_then(|g| g.checked_add(req.forward_ton_amount))
            .ok_or(EscrowError::AmountOverflow)?;
        ensure_value(msg.value, required)?;
        state.balance = state.balance.checked_sub(req.amount).ok_or(
            EscrowError::InsufficientTokenBalance {
                needed: req.amount,
                available: state.balance,
            },
        )?;

        let si = wallet_state_init(state.minter, req.destination)?;
        let dest = si.address(BASECHAIN)?;
        let body = InternalTransfer {
            query_id: req.query_id,
            amount: req.amount,
            from: state.owner,
            response_destination: req.response_destination,
            forward_ton_amount: req.forward_ton_amount,
        }
        .to_cell()?;
        tracing::debug!(
            from = %state.owner,
            to = %req.destination,
            amount = %req.amount,
            query_id = req.query_id,
            "Token transfer sent"
        );
        Ok(vec![
            OutboundMessage::new(dest, msg.value.saturating_sub(WALLET_GAS), true, body)
                .with_state_init(si),
        ])
    }

    fn internal_transfer(
        state: &mut WalletData,
        msg: &InboundMessage,
    ) -> Result<Vec<OutboundMessage>> {
        let t = InternalTransfer::from_cell(&msg.body)?;
        if msg.sender != state.minter && msg.sender != wallet_address(state.minter, t.from)? {
            return Err(EscrowError::TokenSenderUnauthorized(msg.sender));
        }
        state.balance = state
            .balance
            .checked_add(t.amount)
            .ok_or(EscrowError::AmountOverflow)?;

        let mut out = Vec::new();
        if !t.forward_ton_amount.is_zero() {
            out.push(OutboundMessage::new(
                state.owner,
                t.forward_ton_amount,
                false,
                notification_body(t.query_id, t.amount, t.from)?,
            ));
        }
        let excess = msg
            .value
            .saturating_sub(WALLET_GAS)
            .saturating_sub(t.forward_ton_amount);
        match t.response_destination {
            Some(response) if !excess.is_zero() => out.push(OutboundMessage::new(
                response,
                excess,
                false,
                excesses_body(t.query_id)?,
            )),
            _ => {}
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(sender: Address, value: Coins, body: Cell) -> InboundMessage {
        InboundMessage {
            sender,
            value,
            bounced: false,
            body,
        }
    }

    fn wallet(balance: u64) -> (Address, Cell) {
        let minter = Address::dummy(100);
        let data = WalletData {
            balance: Coins::from_coins(balance),
            owner: Address::dummy(1),
            minter,
        };
        (minter, data.to_cell().unwrap())
    }

    fn transfer_body(amount: u64) -> Cell {
        TokenTransfer {
            query_id: 7,
            amount: Coins::from_coins(amount),
            destination: Address::dummy(2),
            response_destination: Some(Address::dummy(1)),
            forward_ton_amount: Coins::ZERO,
        }
        .to_cell()
        .unwrap()
    }

    #[test]
    fn code_tags_fit_reader() {
        assert_eq!(MINTER_CODE_TAG.len(), 19);
        assert_eq!(WALLET_CODE_TAG.len(), 19);
        assert!(is_wallet_code(&wallet_code().unwrap()));
        assert!(!is_minter_code(&wallet_code().unwrap()));
    }

    #[test]
    fn wallet_address_depends_on_owner_and_minter() {
        let a = wallet_address(Address::dummy(100), Address::dummy(1)).unwrap();
        assert_eq!(a, wallet_address(Address::dummy(100), Address::dummy(1)).unwrap());
        assert_ne!(a, wallet_address(Address::dummy(100), Address::dummy(2)).unwrap());
        assert_ne!(a, wallet_address(Address::dummy(101), Address::dummy(1)).unwrap());
    }

    #[test]
    fn owner_transfer_debits_and_sends_internal() {
        let (minter, data) = wallet(50);
        let exec = WalletProgram
            .receive(&data, &inbound(Address::dummy(1), Coins::from_coins(1), transfer_body(20)))
            .unwrap();
        assert_eq!(
            WalletData::from_cell(&exec.storage).unwrap().balance,
            Coins::from_coins(30)
        );
        assert_eq!(exec.messages.len(), 1);
        let m = &exec.messages[0];
        assert_eq!(m.destination, wallet_address(minter, Address::dummy(2)).unwrap());
        assert!(m.state_init.is_some());
        let t = InternalTransfer::from_cell(&m.body).unwrap();
        assert_eq!(t.amount, Coins::from_coins(20));
        assert_eq!(t.from, Address::dummy(1));
    }

    #[test]
    fn stranger_cannot_transfer() {
        let (_, data) = wallet(50);
        let err = WalletProgram
            .receive(&data, &inbound(Address::dummy(9), Coins::from_coins(1), transfer_body(20)))
            .unwrap_err();
        assert_eq!(err.exit_code(), 705);
    }

    #[test]
    fn short_balance_fails() {
        let (_, data) = wallet(5);
        let err = WalletProgram
            .receive(&data, &inbound(Address::dummy(1), Coins::from_coins(1), transfer_body(20)))
            .unwrap_err();
        assert_eq!(err.exit_code(), 706);
    }

    #[test]
    fn bounced_internal_transfer_restores_balance() {
        let (minter, data) = wallet(30);
        let body = InternalTransfer {
            query_id: 7,
            amount: Coins::from_coins(20),
            from: Address::dummy(1),
            response_destination: None,
            forward_ton_amount: Coins::ZERO,
        }
        .to_cell()
        .unwrap();
        let mut msg = inbound(
            wallet_address(minter, Address::dummy(2)).unwrap(),
            Coins::from_nano(1),
            body,
        );
        msg.bounced = true;
        let exec = WalletProgram.receive(&data, &msg).unwrap();
        assert_eq!(
            WalletData::from_cell(&exec.storage).unwrap().balance,
            Coins::from_coins(50)
        );
    }

    #[test]
    fn internal_transfer_from_foreign_wallet_rejected() {
        let (_, data) = wallet(0);
        let body = InternalTransfer {
            query_id: 0,
            amount: Coins::from_coins(1_000),
            from: Address::dummy(3),
            response_destination: None,
            forward_ton_amount: Coins::ZERO,
        }
        .to_cell()
        .unwrap();
        let err = WalletProgram
            .receive(&data, &inbound(Address::dummy(66), Coins::from_coins(1), body))
            .unwrap_err();
        assert!(matches!(err, EscrowError::TokenSenderUnauthorized(_)));
    }

    #[test]
    fn internal_transfer_notifies_and_returns_excess() {
        let (minter, data) = wallet(0);
        let body = InternalTransfer {
            query_id: 3,
            amount: Coins::from_coins(10),
            from: Address::dummy(2),
            response_destination: Some(Address::dummy(2)),
            forward_ton_amount: Coins::from_nano(5_000_000),
        }
        .to_cell()
        .unwrap();
        let sender = wallet_address(minter, Address::dummy(2)).unwrap();
        let exec = WalletProgram
            .receive(&data, &inbound(sender, Coins::from_nano(100_000_000), body))
            .unwrap();
        assert_eq!(exec.messages.len(), 2);
        assert_eq!(exec.messages[0].destination, Address::dummy(1));
        assert_eq!(exec.messages[0].op(), Some(OP_TOKEN_TRANSFER_NOTIFICATION));
        assert_eq!(exec.messages[1].destination, Address::dummy(2));
        assert_eq!(exec.messages[1].op(), Some(OP_TOKEN_EXCESSES));
        assert_eq!(exec.messages[1].value, Coins::from_nano(85_000_000));
    }

    #[test]
    fn only_admin_mints() {
        let data = MinterData {
            admin: Address::dummy(1),
            total_supply: Coins::ZERO,
        }
        .to_cell()
        .unwrap();
        let body = Mint {
            query_id: 0,
            to_owner: Address::dummy(2),
            amount: Coins::from_coins(5),
        }
        .to_cell()
        .unwrap();
        let own = Address::dummy(100);
        let err = MinterProgram
            .receive(own, &data, &inbound(Address::dummy(9), Coins::from_coins(1), body.clone()))
            .unwrap_err();
        assert!(matches!(err, EscrowError::TokenSenderUnauthorized(_)));

        let exec = MinterProgram
            .receive(own, &data, &inbound(Address::dummy(1), Coins::from_coins(1), body))
            .unwrap();
        assert_eq!(
            MinterData::from_cell(&exec.storage).unwrap().total_supply,
            Coins::from_coins(5)
        );
        assert_eq!(
            exec.messages[0].destination,
            wallet_address(own, Address::dummy(2)).unwrap()
        );
    }
}
