//! # tonescrow-contract
//!
//! **Settlement core**: the escrow program and the tooling that drives it.
//!
//! ## Architecture
//!
//! 1. **Dispatcher**: decodes one inbound message, runs the state machine,
//!    returns new storage plus outbound messages (or an error, atomically)
//! 2. **Policy**: pure `(caller, roles, action) → Allow | Deny`
//! 3. **Adapter**: turns a payout into a native transfer or a custody-wallet
//!    token transfer request
//! 4. **Storage**: the persisted record layout
//! 5. **Getters**: `finished` and `data` queries over storage
//! 6. **Client**: state-init, address derivation and message builders
//!
//! ## Message Flow
//!
//! ```text
//! InboundMessage → Dispatcher → storage::load → Policy → Adapter → Execution
//! ```

pub mod adapter;
pub mod client;
pub mod code;
pub mod dispatcher;
pub mod getters;
pub mod policy;
pub mod storage;

pub use adapter::{AssetTransferAdapter, Payout};
pub use client::EscrowClient;
pub use code::EscrowCode;
pub use dispatcher::{EscrowContract, Execution};
pub use getters::{GetMethod, GetResult};
pub use policy::Decision;
