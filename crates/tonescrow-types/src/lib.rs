//! # tonescrow-types
//!
//! Shared types, errors, and configuration for the **TonEscrow** settlement core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Addresses**: [`Address`], [`StateInit`] (deterministic contract addresses)
//! - **Amounts**: [`Coins`] (nano units, decimal display)
//! - **Cells**: [`Cell`], [`CellBuilder`], [`CellSlice`] (bit-level codec)
//! - **Messages**: [`Action`], [`ActionKind`], [`ConstructPayload`], [`TokenTransfer`],
//!   [`InboundMessage`], [`OutboundMessage`]
//! - **Escrow record**: [`Roles`], [`Role`], [`AssetMode`], [`Salt`], [`Agreement`],
//!   [`Stage`], [`EscrowState`], [`EscrowData`]
//! - **Configuration**: [`GasConfig`], [`EscrowConfig`]
//! - **Errors**: [`EscrowError`] with `ESC_ERR_` prefix codes
//! - **Constants**: opcodes, limits and defaults

pub mod address;
pub mod cell;
pub mod coins;
pub mod config;
pub mod constants;
pub mod error;
pub mod message;
pub mod state;

// Re-export all primary types at crate root for ergonomic imports:
//   use tonescrow_types::{Address, Coins, Cell, EscrowState, ...};

pub use address::*;
pub use cell::*;
pub use coins::*;
pub use config::*;
pub use error::*;
pub use message::*;
pub use state::*;

// Constants are accessed via `tonescrow_types::constants::FOO`
// (not re-exported to avoid name collisions).
