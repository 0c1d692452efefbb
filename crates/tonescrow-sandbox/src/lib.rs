//! # tonescrow-sandbox
//!
//! **In-memory ledger** for exercising escrow instances end to end.
//!
//! ## Architecture
//!
//! 1. **Blockchain**: accounts, FIFO message delivery, all-or-nothing
//!    execution per message, bounces and flat fees
//! 2. **Program**: maps a code cell to the escrow, token minter or token wallet
//! 3. **Token**: minter/wallet programs with deterministic wallet addresses
//! 4. **SupplyConservation**: `Σ wallet balances == Σ minted` per minter
//! 5. **Transaction / TxMatch**: execution records and assertions over them

pub mod config;
pub mod ledger;
pub mod program;
pub mod supply;
pub mod token;
pub mod transaction;

pub use config::LedgerConfig;
pub use ledger::{Account, AccountState, Blockchain};
pub use program::Program;
pub use supply::SupplyConservation;
pub use transaction::{Transaction, TxMatch};
