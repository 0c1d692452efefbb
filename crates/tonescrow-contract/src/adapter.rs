//! Asset transfer adapter: turns a logical payout into an outbound message.
//!
//! - **Native**: a plain value transfer straight to the recipient,
//!   non-bounceable so a payout can never be pulled back into the escrow.
//! - **Token**: a transfer request to the escrow's custody wallet, carrying
//!   [`GasConfig::token_transfer_value`] to pay for the wallet's work. The
//!   request is bounceable; a failed request returns as a bounce that the
//!   dispatcher ignores.
//!
//! The adapter builds messages only. Whether the escrow (or its custody
//! wallet) actually holds the funds is the ledger's business.

use tonescrow_types::{
    AssetMode, Address, Cell, Coins, GasConfig, OutboundMessage, Result, TokenTransfer,
};

/// One logical payment out of the escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub recipient: Address,
    pub value: Coins,
    /// Correlates the token wallet's response. Ignored for native payouts.
    pub query_id: u64,
}

/// Emits payout messages for one asset mode.
#[derive(Debug, Clone, Copy)]
pub struct AssetTransferAdapter {
    asset: AssetMode,
    gas: GasConfig,
}

impl AssetTransferAdapter {
    #[must_use]
    pub fn new(asset: AssetMode, gas: GasConfig) -> Self {
        Self { asset, gas }
    }

    /// Build the outbound message for `payout`.
    ///
    /// `response_to` receives the custody wallet's leftover forwarding value
    /// in token mode.
    pub fn emit(&self, payout: &Payout, response_to: Address) -> Result<OutboundMessage> {
        match self.asset {
            AssetMode::Native => Ok(OutboundMessage::new(
                payout.recipient,
                payout.value,
                false,
                Cell::empty(),
            )),
            AssetMode::Token { wallet } => {
                let body = TokenTransfer {
                    query_id: payout.query_id,
                    amount: payout.value,
                    destination: payout.recipient,
                    response_destination: Some(response_to),
                    forward_ton_amount: Coins::ZERO,
                }
                .to_cell()?;
                Ok(OutboundMessage::new(
                    wallet,
                    self.gas.token_transfer_value,
                    true,
                    body,
                ))
            }
        }
    }
}
