//! System-wide constants for the TonEscrow settlement core.

// ---------------------------------------------------------------------------
// Escrow opcodes (32-bit body prefix)
// ---------------------------------------------------------------------------

/// One-time construction of an escrow instance.
pub const OP_CONSTRUCT: u32 = 0x0000_0001;

/// Release the principal to the worker.
pub const OP_WITHDRAW: u32 = 0xcb03_bfaf;

/// Return the principal to the investor.
pub const OP_REFUND: u32 = 0xc135_f40c;

// ---------------------------------------------------------------------------
// Fungible token wallet opcodes
// ---------------------------------------------------------------------------

/// Owner asks its wallet to move tokens to another owner.
pub const OP_TOKEN_TRANSFER: u32 = 0x0f8a_7ea5;

/// Wallet-to-wallet credit instruction.
pub const OP_TOKEN_INTERNAL_TRANSFER: u32 = 0x178d_4519;

/// Sent by a wallet to its owner after an incoming credit with forward value.
pub const OP_TOKEN_TRANSFER_NOTIFICATION: u32 = 0x7362_d09c;

/// Unused forwarding value returned to the response destination.
pub const OP_TOKEN_EXCESSES: u32 = 0xd532_76db;

/// Minter admin asks the minter to issue new tokens.
pub const OP_TOKEN_MINT: u32 = 0x0000_0015;

// ---------------------------------------------------------------------------
// Coin amounts
// ---------------------------------------------------------------------------

/// Decimal places of a coin amount.
pub const COIN_DECIMALS: u32 = 9;

/// Nano units in one whole coin.
pub const NANO_PER_COIN: u128 = 1_000_000_000;

/// Largest byte length of an encoded coin amount (4-bit length prefix).
pub const COINS_MAX_BYTES: usize = 15;

/// Default value kept on a native escrow on top of the locked amounts.
pub const DEFAULT_GAS_RESERVE_NANO: u128 = 10_000_000;

/// Default minimum value attached to a withdraw or refund.
pub const DEFAULT_ACTION_GAS_NANO: u128 = 10_000_000;

/// Default value attached to each transfer request sent to a custody wallet.
pub const DEFAULT_TOKEN_TRANSFER_VALUE_NANO: u128 = 50_000_000;

// ---------------------------------------------------------------------------
// Cells and addresses
// ---------------------------------------------------------------------------

/// Maximum number of data bits in one cell.
pub const CELL_MAX_BITS: usize = 1023;

/// Maximum number of child references in one cell.
pub const CELL_MAX_REFS: usize = 4;

/// The default workchain for user contracts.
pub const BASECHAIN: i8 = 0;
