//! Client-side helpers for tooling that deploys and drives an escrow.
//!
//! The client never talks to a ledger. It builds the state-init, derives the
//! instance address, and produces the messages a wallet should send together
//! with the value it should attach.

use tonescrow_types::{
    Action, Address, Coins, EscrowConfig, EscrowError, GasConfig, OutboundMessage, Result, Salt,
    StateInit, constants::BASECHAIN,
};

use crate::{code::EscrowCode, storage};

/// Extra value recommended on top of each minimum, covering ledger fees.
const FEE_HEADROOM: Coins = Coins::from_nano(50_000_000);

/// Builder for one escrow instance: code image plus salt.
#[derive(Debug, Clone)]
pub struct EscrowClient {
    gas: GasConfig,
    salt: Salt,
    state_init: StateInit,
    address: Address,
}

impl EscrowClient {
    pub fn new(gas: GasConfig, salt: Salt) -> Result<Self> {
        let state_init = StateInit::new(EscrowCode::new(gas).to_cell()?, storage::initial_data(salt)?);
        let address = state_init.address(BASECHAIN)?;
        tracing::debug!(
            address = %address,
            salt = %salt,
            code_hash = hex::encode(state_init.code.hash()),
            "Escrow address derived"
        );
        Ok(Self {
            gas,
            salt,
            state_init,
            address,
        })
    }

    /// Default gas thresholds and a fresh random salt.
    pub fn with_defaults() -> Result<Self> {
        Self::new(GasConfig::default(), Salt::random())
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn salt(&self) -> Salt {
        self.salt
    }

    #[must_use]
    pub fn state_init(&self) -> &StateInit {
        &self.state_init
    }

    #[must_use]
    pub fn gas(&self) -> &GasConfig {
        &self.gas
    }

    /// Value to attach to the deploy-and-construct message.
    pub fn deploy_value(&self, config: &EscrowConfig) -> Result<Coins> {
        self.gas
            .construct_requirement(&config.asset(), config.amount, config.amount_interest)?
            .checked_add(FEE_HEADROOM)
            .ok_or(EscrowError::AmountOverflow)
    }

    /// Value to attach to a withdraw or refund.
    pub fn action_value(&self, config: &EscrowConfig) -> Result<Coins> {
        self.gas
            .action_requirement(&config.asset())?
            .checked_add(FEE_HEADROOM)
            .ok_or(EscrowError::AmountOverflow)
    }

    /// Deploys the instance and constructs it in one message.
    pub fn deploy_message(&self, config: &EscrowConfig) -> Result<OutboundMessage> {
        let body = Action::Construct(config.payload()).encode()?;
        Ok(
            OutboundMessage::new(self.address, self.deploy_value(config)?, false, body)
                .with_state_init(self.state_init.clone()),
        )
    }

    pub fn withdraw_message(&self, config: &EscrowConfig) -> Result<OutboundMessage> {
        self.action_message(Action::Withdraw, config)
    }

    pub fn refund_message(&self, config: &EscrowConfig) -> Result<OutboundMessage> {
        self.action_message(Action::Refund, config)
    }

    fn action_message(&self, action: Action, config: &EscrowConfig) -> Result<OutboundMessage> {
        Ok(OutboundMessage::new(
            self.address,
            self.action_value(config)?,
            true,
            action.encode()?,
        ))
    }
}
