//! Escrow dispatcher: the contract's message handler.
//!
//! The ledger hands the dispatcher one inbound message and the persisted
//! storage cell, and commits the returned [`Execution`] only if the call
//! succeeds. A returned error means nothing happened: the storage cell is
//! untouched and no message is emitted.
//!
//! ## Withdraw / Refund Flow
//!
//! 1. Initialized? (`NotInitialized`)
//! 2. Not finished? (`AlreadyFinished`)
//! 3. Caller permitted? (`Unauthorized`)
//! 4. Attached value covers the action? (`InsufficientValue`)
//! 5. Flip `finished`, emit principal payout, emit fee payout
//!
//! Settlement is optimistic: `finished` is committed together with the payout
//! messages, before the downstream transfers are known to succeed. A payout
//! that later bounces comes back as a bounced message and is ignored.

use tonescrow_types::{
    Action, ActionKind, Address, Agreement, Cell, Coins, ConstructPayload, EscrowError,
    EscrowState, GasConfig, InboundMessage, OutboundMessage, Result, Stage,
    constants::{OP_TOKEN_EXCESSES, OP_TOKEN_TRANSFER_NOTIFICATION},
};

use crate::{
    adapter::{AssetTransferAdapter, Payout},
    code::EscrowCode,
    policy, storage,
};

/// Query id of the principal payout.
pub const PRINCIPAL_QUERY_ID: u64 = 0;

/// Query id of the guarantor fee payout.
pub const FEE_QUERY_ID: u64 = 1;

/// The committed outcome of one successful message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Storage to persist.
    pub storage: Cell,
    /// Messages to send, in order.
    pub messages: Vec<OutboundMessage>,
}

impl Execution {
    fn unchanged(storage: &Cell) -> Self {
        Self {
            storage: storage.clone(),
            messages: Vec::new(),
        }
    }
}

/// How an inbound message is routed before any state is read.
#[derive(Debug)]
enum Inbound {
    /// A message of ours that failed downstream.
    Bounced,
    /// Value with no instruction.
    TopUp,
    /// Token wallet chatter: funding notification or returned excesses.
    TokenNotice(u32),
    Action(Action),
}

impl Inbound {
    fn classify(msg: &InboundMessage) -> Result<Self> {
        if msg.bounced {
            return Ok(Self::Bounced);
        }
        match msg.op() {
            None => Ok(Self::TopUp),
            Some(op @ (OP_TOKEN_TRANSFER_NOTIFICATION | OP_TOKEN_EXCESSES)) => {
                Ok(Self::TokenNotice(op))
            }
            Some(_) => Action::decode(&msg.body).map(Self::Action),
        }
    }
}

/// The escrow program, parameterized by the gas thresholds of its code image.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscrowContract {
    gas: GasConfig,
}

impl EscrowContract {
    #[must_use]
    pub fn new(gas: GasConfig) -> Self {
        Self { gas }
    }

    /// Load the program from its code cell.
    ///
    /// # Errors
    /// Returns `UnknownCode` if the cell is not an escrow image.
    pub fn from_code(code: &Cell) -> Result<Self> {
        EscrowCode::from_cell(code).map(|c| Self::new(c.gas))
    }

    #[must_use]
    pub fn gas(&self) -> &GasConfig {
        &self.gas
    }

    /// Handle one inbound message against the persisted `storage`.
    ///
    /// # Errors
    /// Any error aborts the message with no state change. See the module docs
    /// for the withdraw/refund check order.
    pub fn receive(&self, storage: &Cell, msg: &InboundMessage) -> Result<Execution> {
        match Inbound::classify(msg)? {
            Inbound::Bounced => {
                tracing::warn!(
                    from = %msg.sender,
                    value = %msg.value,
                    "Downstream payout bounced; settlement stays final"
                );
                Ok(Execution::unchanged(storage))
            }
            Inbound::TopUp => {
                tracing::debug!(from = %msg.sender, value = %msg.value, "Top-up accepted");
                Ok(Execution::unchanged(storage))
            }
            Inbound::TokenNotice(op) => {
                tracing::debug!(
                    from = %msg.sender,
                    op,
                    "Token wallet notice accepted"
                );
                Ok(Execution::unchanged(storage))
            }
            Inbound::Action(action) => {
                let mut state = storage::load(storage)?;
                tracing::debug!(
                    from = %msg.sender,
                    action = %action.kind(),
                    stage = %state.stage,
                    value = %msg.value,
                    "Action decoded"
                );
                let result = match &action {
                    Action::Construct(payload) => self.construct(&mut state, payload, msg.value),
                    Action::Withdraw | Action::Refund => {
                        self.settle(&mut state, action.kind(), msg.sender, msg.value)
                    }
                };
                match result {
                    Ok(messages) => Ok(Execution {
                        storage: storage::store(&state)?,
                        messages,
                    }),
                    Err(err) => {
                        tracing::warn!(
                            from = %msg.sender,
                            action = %action.kind(),
                            code = err.exit_code(),
                            error = %err,
                            "Action rejected"
                        );
                        Err(err)
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Construct
    // -----------------------------------------------------------------------

    fn construct(
        &self,
        state: &mut EscrowState,
        payload: &ConstructPayload,
        attached: Coins,
    ) -> Result<Vec<OutboundMessage>> {
        if state.is_initialized() {
            return Err(EscrowError::ReconstructionAttempt);
        }
        let required =
            self.gas
                .construct_requirement(&payload.asset, payload.amount, payload.amount_interest)?;
        if attached < required {
            return Err(EscrowError::InsufficientValue { required, attached });
        }

        state.activate(Agreement {
            roles: payload.roles,
            asset: payload.asset,
            amount: payload.amount,
            amount_interest: payload.amount_interest,
        })?;

        tracing::info!(
            investor = %payload.roles.investor,
            worker = %payload.roles.worker,
            guarantor = %payload.roles.guarantor,
            asset = %payload.asset,
            amount = %payload.amount,
            interest = %payload.amount_interest,
            "Escrow constructed"
        );
        Ok(Vec::new())
    }

    // -----------------------------------------------------------------------
    // Withdraw / Refund
    // -----------------------------------------------------------------------

    fn settle(
        &self,
        state: &mut EscrowState,
        action: ActionKind,
        caller: Address,
        attached: Coins,
    ) -> Result<Vec<OutboundMessage>> {
        // 1-2. Lifecycle
        let agreement = match state.stage {
            Stage::Uninitialized => return Err(EscrowError::NotInitialized),
            Stage::Finished(_) => return Err(EscrowError::AlreadyFinished),
            Stage::Active(a) => a,
        };

        // 3. Authorization
        policy::authorize(&caller, &agreement.roles, action)?;

        // 4. Value
        let required = self.gas.action_requirement(&agreement.asset)?;
        if attached < required {
            return Err(EscrowError::InsufficientValue { required, attached });
        }

        // 5. Effects
        let principal_to = match action {
            ActionKind::Withdraw => agreement.roles.worker,
            ActionKind::Refund => agreement.roles.investor,
            ActionKind::Construct => {
                return Err(EscrowError::Internal(
                    "construct routed to settlement".into(),
                ));
            }
        };
        let adapter = AssetTransferAdapter::new(agreement.asset, self.gas);
        let messages = vec![
            adapter.emit(
                &Payout {
                    recipient: principal_to,
                    value: agreement.amount,
                    query_id: PRINCIPAL_QUERY_ID,
                },
                caller,
            )?,
            adapter.emit(
                &Payout {
                    recipient: agreement.roles.guarantor,
                    value: agreement.amount_interest,
                    query_id: FEE_QUERY_ID,
                },
                caller,
            )?,
        ];
        state.finish()?;

        for m in &messages {
            tracing::debug!(to = %m.destination, value = %m.value, "Payout emitted");
        }
        tracing::info!(
            action = %action,
            caller = %caller,
            principal_to = %principal_to,
            amount = %agreement.amount,
            interest = %agreement.amount_interest,
            asset = %agreement.asset,
            "Escrow finished"
        );
        Ok(messages)
    }
}
