//! Code-image dispatch: which program runs for a given code cell.

use tonescrow_contract::{EscrowContract, Execution};
use tonescrow_types::{Address, Cell, InboundMessage, Result};

use crate::token::{self, MinterProgram, WalletProgram};

/// A program the sandbox can execute.
#[derive(Debug, Clone, Copy)]
pub enum Program {
    Escrow(EscrowContract),
    TokenMinter(MinterProgram),
    TokenWallet(WalletProgram),
}

impl Program {
    /// # Errors
    /// Returns `UnknownCode` for a code cell matching no known image.
    pub fn from_code(code: &Cell) -> Result<Self> {
        if token::is_minter_code(code) {
            return Ok(Self::TokenMinter(MinterProgram));
        }
        if token::is_wallet_code(code) {
            return Ok(Self::TokenWallet(WalletProgram));
        }
        EscrowContract::from_code(code).map(Self::Escrow)
    }

    /// Run the program for one inbound message on the account at `own`.
    pub fn execute(&self, own: Address, data: &Cell, msg: &InboundMessage) -> Result<Execution> {
        match self {
            Self::Escrow(contract) => contract.receive(data, msg),
            Self::TokenMinter(minter) => minter.receive(own, data, msg),
            Self::TokenWallet(wallet) => wallet.receive(data, msg),
        }
    }
}
