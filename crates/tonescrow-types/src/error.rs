//! Error types for the TonEscrow settlement core.
//!
//! All errors use the `ESC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Cell codec errors
//! - 2xx: Authorization errors
//! - 3xx: Lifecycle errors
//! - 4xx: Value / gas errors
//! - 5xx: Payload and configuration errors
//! - 6xx: Ledger and token wallet errors
//! - 9xx: General / internal errors
//!
//! Every variant also carries a numeric [`EscrowError::exit_code`], the value
//! a ledger records on the failed transaction.

use thiserror::Error;

use crate::{ActionKind, Address, Coins};

/// Central error enum for all TonEscrow operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Cell Codec Errors (1xx)
    // =================================================================
    /// A write would exceed the bit or reference capacity of a cell.
    #[error("ESC_ERR_100: Cell overflow: {reason}")]
    CellOverflow { reason: String },

    /// A read ran past the end of a cell.
    #[error("ESC_ERR_101: Cell underflow: {reason}")]
    CellUnderflow { reason: String },

    /// An address could not be decoded or parsed.
    #[error("ESC_ERR_102: Invalid address: {reason}")]
    InvalidAddress { reason: String },

    /// A coin amount could not be parsed or converted.
    #[error("ESC_ERR_103: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A coin amount does not fit the 120-bit encoding.
    #[error("ESC_ERR_104: Amount overflow")]
    AmountOverflow,

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The caller is not in the permitted set for the requested action.
    #[error("ESC_ERR_200: Unauthorized: {caller} may not {action}")]
    Unauthorized { caller: Address, action: ActionKind },

    // =================================================================
    // Lifecycle Errors (3xx)
    // =================================================================
    /// The escrow already executed its terminal transition.
    #[error("ESC_ERR_300: Escrow already finished")]
    AlreadyFinished,

    /// A construct message arrived on an initialized instance.
    #[error("ESC_ERR_301: Escrow already constructed")]
    ReconstructionAttempt,

    /// A withdraw or refund arrived before construction.
    #[error("ESC_ERR_302: Escrow not initialized")]
    NotInitialized,

    // =================================================================
    // Value / Gas Errors (4xx)
    // =================================================================
    /// The attached value does not cover the action's requirements.
    #[error("ESC_ERR_400: Insufficient attached value: need {required}, got {attached}")]
    InsufficientValue { required: Coins, attached: Coins },

    // =================================================================
    // Payload / Configuration Errors (5xx)
    // =================================================================
    /// The message body starts with an opcode the contract does not handle.
    #[error("ESC_ERR_500: Unknown opcode: {0:#010x}")]
    UnknownOpcode(u32),

    /// A message body or persisted record is structurally invalid.
    #[error("ESC_ERR_501: Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// A code image is not one the runtime knows how to execute.
    #[error("ESC_ERR_502: Unknown code image: {reason}")]
    UnknownCode { reason: String },

    /// Serialization / deserialization error.
    #[error("ESC_ERR_503: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("ESC_ERR_504: Configuration error: {0}")]
    Configuration(String),

    // =================================================================
    // Ledger / Token Wallet Errors (6xx)
    // =================================================================
    /// No account lives at the given address.
    #[error("ESC_ERR_600: Account not found: {0}")]
    AccountNotFound(Address),

    /// An account cannot pay for a value transfer plus its fees.
    #[error("ESC_ERR_601: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Coins, available: Coins },

    /// A token wallet or minter received an instruction from a stranger.
    #[error("ESC_ERR_602: Token sender unauthorized: {0}")]
    TokenSenderUnauthorized(Address),

    /// A token wallet holds fewer tokens than the transfer asks for.
    #[error("ESC_ERR_603: Insufficient token balance: need {needed}, have {available}")]
    InsufficientTokenBalance { needed: Coins, available: Coins },

    /// A bounceable message reached an account with no code.
    #[error("ESC_ERR_604: Account {0} is not active")]
    InactiveAccount(Address),

    /// A state-init does not derive the address it was sent to.
    #[error("ESC_ERR_605: State-init mismatch for {0}")]
    StateInitMismatch(Address),

    /// Token supply invariant violated: Σ wallet balances ≠ Σ minted.
    /// This is a critical error: it indicates a bug in wallet accounting.
    #[error("ESC_ERR_606: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("ESC_ERR_900: Internal error: {0}")]
    Internal(String),
}

impl EscrowError {
    /// The numeric exit code a ledger records for this failure.
    ///
    /// Codec failures reuse the runtime's conventional cell overflow (8),
    /// cell underflow (9) and integer range (5) codes; token wallet failures
    /// use the fungible token standard's 70x range.
    #[must_use]
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::AmountOverflow => 5,
            Self::CellOverflow { .. } => 8,
            Self::CellUnderflow { .. } => 9,
            Self::InvalidAddress { .. } => 136,
            Self::InvalidAmount { .. } => 137,
            Self::Unauthorized { .. } => 401,
            Self::AlreadyFinished => 402,
            Self::ReconstructionAttempt => 403,
            Self::NotInitialized => 404,
            Self::InsufficientValue { .. } => 405,
            Self::InvalidPayload { .. } => 406,
            Self::UnknownCode { .. } => 407,
            Self::Serialization(_) | Self::Configuration(_) => 408,
            Self::InactiveAccount(_) | Self::StateInitMismatch(_) => 409,
            Self::AccountNotFound(_) => 410,
            Self::SupplyInvariantViolation { .. } => 411,
            Self::InsufficientBalance { .. } => 37,
            Self::TokenSenderUnauthorized(_) => 705,
            Self::InsufficientTokenBalance { .. } => 706,
            Self::UnknownOpcode(_) => 0xffff,
            Self::Internal(_) => 999,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_display_names_caller_and_action() {
        let caller = Address::new(0, [7u8; 32]);
        let err = EscrowError::Unauthorized {
            caller,
            action: ActionKind::Withdraw,
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("ESC_ERR_200"), "Got: {msg}");
        assert!(msg.contains("withdraw"));
        assert!(msg.contains(&caller.to_string()));
    }

    #[test]
    fn insufficient_value_display() {
        let err = EscrowError::InsufficientValue {
            required: Coins::from_nano(110_000_000),
            attached: Coins::from_nano(10_000_000),
        };
        let msg = format!("{err}");
        assert!(msg.contains("ESC_ERR_400"));
        assert!(msg.contains("0.11"));
        assert!(msg.contains("0.01"));
    }

    #[test]
    fn unknown_opcode_is_hex() {
        let msg = EscrowError::UnknownOpcode(0xdead_beef).to_string();
        assert!(msg.contains("0xdeadbeef"), "Got: {msg}");
    }

    #[test]
    fn taxonomy_exit_codes_are_distinct() {
        let codes = [
            EscrowError::Unauthorized {
                caller: Address::new(0, [0u8; 32]),
                action: ActionKind::Refund,
            }
            .exit_code(),
            EscrowError::AlreadyFinished.exit_code(),
            EscrowError::ReconstructionAttempt.exit_code(),
            EscrowError::NotInitialized.exit_code(),
            EscrowError::InsufficientValue {
                required: Coins::ZERO,
                attached: Coins::ZERO,
            }
            .exit_code(),
        ];
        let unique: std::collections::HashSet<u32> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.iter().all(|&c| c != 0), "0 is the success exit code");
    }

    #[test]
    fn all_errors_have_esc_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(EscrowError::AlreadyFinished),
            Box::new(EscrowError::ReconstructionAttempt),
            Box::new(EscrowError::AmountOverflow),
            Box::new(EscrowError::Internal("test".into())),
            Box::new(EscrowError::CellUnderflow {
                reason: "a".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("ESC_ERR_"),
                "Error missing ESC_ERR_ prefix: {msg}"
            );
        }
    }
}
