//! In-memory ledger.
//!
//! ## Execution Model
//!
//! 1. `send` debits the external sender (value + forward fee) and queues
//!    the message
//! 2. Messages are delivered FIFO, one at a time, each to completion
//! 3. Delivery credits the value, deploys from the state-init if the account
//!    is new, charges the compute fee and runs the account's program
//! 4. Outbound messages are paid from the account (value + forward fee)
//!    and queued
//! 5. Any failure restores the account exactly as it was; a bounceable
//!    message then returns its value, minus the burned fees, to the sender,
//!    while a non-bounceable one leaves its value on the account
//!
//! Plain wallets (treasuries) and uninitialized accounts run no code and pay
//! no compute fee.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tonescrow_contract::{EscrowCode, GetMethod, GetResult, getters};
use tonescrow_types::{
    Address, Cell, Coins, EscrowData, EscrowError, InboundMessage, OutboundMessage, Result,
    StateInit, TokenTransfer,
    constants::{BASECHAIN, OP_TOKEN_MINT},
};

use crate::{
    config::LedgerConfig,
    program::Program,
    supply::SupplyConservation,
    token::{self, MinterData, WalletData},
    transaction::{Transaction, TxMatch},
};

/// Upper bound on messages processed by one `send`.
const MAX_QUEUE_STEPS: usize = 10_000;

/// Value sent along with a minter deployment.
const MINTER_DEPLOY_VALUE: Coins = Coins::from_coins(1);

/// Value attached to a mint instruction.
const MINT_VALUE: Coins = Coins::from_nano(100_000_000);

/// Value attached to a token transfer request, on top of the forward amount.
const TOKEN_TRANSFER_GAS: Coins = Coins::from_nano(100_000_000);

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// What an account runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    /// Holds value, has no code.
    Uninit,
    /// An externally controlled wallet: accepts everything, runs no code.
    Wallet,
    /// A deployed contract.
    Active { code: Cell, data: Cell },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub balance: Coins,
    pub state: AccountState,
}

impl Account {
    fn uninit() -> Self {
        Self {
            balance: Coins::ZERO,
            state: AccountState::Uninit,
        }
    }
}

#[derive(Debug, Clone)]
struct Envelope {
    from: Address,
    msg: OutboundMessage,
    bounced: bool,
}

// ---------------------------------------------------------------------------
// Blockchain
// ---------------------------------------------------------------------------

/// The sandbox ledger.
pub struct Blockchain {
    config: LedgerConfig,
    accounts: HashMap<Address, Account>,
    /// Logical time of the last executed transaction.
    lt: u64,
    supply: SupplyConservation,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Blockchain {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            accounts: HashMap::new(),
            lt: 0,
            supply: SupplyConservation::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// A funded external wallet with a deterministic address. Calling twice
    /// with the same name returns the same wallet without refunding it.
    pub fn treasury(&mut self, name: &str) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(b"tonescrow:treasury:");
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        let address = Address::new(BASECHAIN, bytes);

        let balance = self.config.treasury_balance;
        self.accounts.entry(address).or_insert_with(|| {
            tracing::debug!(treasury = name, address = %address, balance = %balance, "Treasury created");
            Account {
                balance,
                state: AccountState::Wallet,
            }
        });
        address
    }

    #[must_use]
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Native balance; zero for unknown accounts.
    #[must_use]
    pub fn balance(&self, address: &Address) -> Coins {
        self.accounts
            .get(address)
            .map_or(Coins::ZERO, |a| a.balance)
    }

    /// Send a message from an external wallet and run the ledger until no
    /// messages remain.
    ///
    /// # Errors
    /// - `AccountNotFound` if `from` does not exist
    /// - `InsufficientBalance` if `from` cannot pay value plus forward fee
    /// - `Internal` if the message cascade does not terminate
    ///
    /// Failures inside the cascade are not errors: they are recorded on the
    /// returned transactions.
    pub fn send(&mut self, from: Address, msg: OutboundMessage) -> Result<Vec<Transaction>> {
        let cost = msg
            .value
            .checked_add(self.config.forward_fee)
            .ok_or(EscrowError::AmountOverflow)?;
        let sender = self
            .accounts
            .get_mut(&from)
            .ok_or(EscrowError::AccountNotFound(from))?;
        sender.balance = sender
            .balance
            .checked_sub(cost)
            .ok_or(EscrowError::InsufficientBalance {
                needed: cost,
                available: sender.balance,
            })?;

        let mut queue = VecDeque::from([Envelope {
            from,
            msg,
            bounced: false,
        }]);
        let mut txs = Vec::new();
        while let Some(env) = queue.pop_front() {
            if txs.len() >= MAX_QUEUE_STEPS {
                return Err(EscrowError::Internal(format!(
                    "message cascade exceeded {MAX_QUEUE_STEPS} steps"
                )));
            }
            txs.push(self.deliver(env, &mut queue));
        }
        Ok(txs)
    }

    fn deliver(&mut self, env: Envelope, queue: &mut VecDeque<Envelope>) -> Transaction {
        self.lt += 1;
        let to = env.msg.destination;
        let snapshot = self.accounts.get(&to).cloned();

        let (success, exit_code, deploy, out_count) = match self.execute(&env) {
            Ok((deploy, out)) => {
                let n = out.len();
                queue.extend(out);
                (true, 0, deploy, n)
            }
            Err(err) => {
                match snapshot {
                    Some(account) => self.accounts.insert(to, account),
                    None => self.accounts.remove(&to),
                };
                tracing::warn!(
                    lt = self.lt,
                    from = %env.from,
                    to = %to,
                    code = err.exit_code(),
                    error = %err,
                    "Transaction failed"
                );
                let out_count = self.refund_failed(&env, queue);
                (false, err.exit_code(), false, out_count)
            }
        };

        let tx = Transaction {
            lt: self.lt,
            from: env.from,
            to,
            value: env.msg.value,
            op: env.msg.op(),
            deploy,
            success,
            exit_code,
            bounced: env.bounced,
            out_count,
            executed_at: Utc::now(),
        };
        tracing::debug!(
            lt = tx.lt,
            from = %tx.from,
            to = %tx.to,
            value = %tx.value,
            op = ?tx.op,
            success = tx.success,
            exit_code = tx.exit_code,
            "Transaction executed"
        );
        tx
    }

    /// After a rolled-back execution: bounce the value home, or keep it.
    fn refund_failed(&mut self, env: &Envelope, queue: &mut VecDeque<Envelope>) -> usize {
        let to = env.msg.destination;
        let value = env.msg.value;
        if env.msg.bounce && !env.bounced {
            let fees = self
                .config
                .compute_fee
                .checked_add(self.config.forward_fee)
                .unwrap_or(Coins::MAX);
            // The fees are burned; the failed account keeps nothing.
            let back = value.saturating_sub(fees);
            queue.push_back(Envelope {
                from: to,
                msg: OutboundMessage::new(env.from, back, false, env.msg.body.clone()),
                bounced: true,
            });
            1
        } else {
            let account = self.accounts.entry(to).or_insert_with(Account::uninit);
            account.balance = account.balance.checked_add(value).unwrap_or(Coins::MAX);
            0
        }
    }

    /// Run one message against its destination. On error the caller restores
    /// the account.
    fn execute(&mut self, env: &Envelope) -> Result<(bool, Vec<Envelope>)> {
        let config = self.config;
        let to = env.msg.destination;
        let account = self.accounts.entry(to).or_insert_with(Account::uninit);
        account.balance = account
            .balance
            .checked_add(env.msg.value)
            .ok_or(EscrowError::AmountOverflow)?;

        let mut deploy = false;
        if account.state == AccountState::Uninit {
            if let Some(si) = &env.msg.state_init {
                if si.address(to.workchain)? != to {
                    return Err(EscrowError::StateInitMismatch(to));
                }
                account.state = AccountState::Active {
                    code: si.code.clone(),
                    data: si.data.clone(),
                };
                deploy = true;
            }
        }

        let (code, data) = match &account.state {
            AccountState::Uninit if env.msg.bounce => {
                return Err(EscrowError::InactiveAccount(to));
            }
            AccountState::Uninit | AccountState::Wallet => return Ok((deploy, Vec::new())),
            AccountState::Active { code, data } => (code.clone(), data.clone()),
        };

        account.balance = account.balance.checked_sub(config.compute_fee).ok_or(
            EscrowError::InsufficientBalance {
                needed: config.compute_fee,
                available: account.balance,
            },
        )?;

        let inbound = InboundMessage {
            sender: env.from,
            value: env.msg.value,
            bounced: env.bounced,
            body: env.msg.body.clone(),
        };
        let exec = Program::from_code(&code)?.execute(to, &data, &inbound)?;

        let mut out = Vec::with_capacity(exec.messages.len());
        for msg in exec.messages {
            let cost = msg
                .value
                .checked_add(config.forward_fee)
                .ok_or(EscrowError::AmountOverflow)?;
            account.balance = account.balance.checked_sub(cost).ok_or(
                EscrowError::InsufficientBalance {
                    needed: cost,
                    available: account.balance,
                },
            )?;
            out.push(Envelope {
                from: to,
                msg,
                bounced: false,
            });
        }
        account.state = AccountState::Active {
            code,
            data: exec.storage,
        };
        Ok((deploy, out))
    }

    fn contract(&self, address: &Address) -> Result<(&Cell, &Cell)> {
        match self.accounts.get(address).map(|a| &a.state) {
            Some(AccountState::Active { code, data }) => Ok((code, data)),
            Some(_) => Err(EscrowError::InactiveAccount(*address)),
            None => Err(EscrowError::AccountNotFound(*address)),
        }
    }

    // -----------------------------------------------------------------------
    // Escrow queries
    // -----------------------------------------------------------------------

    fn escrow_storage(&self, address: &Address) -> Result<&Cell> {
        let (code, data) = self.contract(address)?;
        EscrowCode::from_cell(code)?;
        Ok(data)
    }

    pub fn escrow_finished(&self, address: &Address) -> Result<bool> {
        getters::is_finished(self.escrow_storage(address)?)
    }

    pub fn escrow_data(&self, address: &Address) -> Result<EscrowData> {
        getters::get_data(self.escrow_storage(address)?)
    }

    /// Run a named get-method on an escrow.
    pub fn run_get_method(&self, address: &Address, method: GetMethod) -> Result<GetResult> {
        method.run(self.escrow_storage(address)?)
    }

    // -----------------------------------------------------------------------
    // Tokens
    // -----------------------------------------------------------------------

    /// Deploy a token minter administered by `admin` (a treasury).
    pub fn deploy_token_minter(&mut self, admin: Address) -> Result<Address> {
        let data = MinterData {
            admin,
            total_supply: Coins::ZERO,
        };
        let si = StateInit::new(token::minter_code()?, data.to_cell()?);
        let minter = si.address(BASECHAIN)?;
        let txs = self.send(
            admin,
            OutboundMessage::new(minter, MINTER_DEPLOY_VALUE, false, Cell::empty())
                .with_state_init(si),
        )?;
        if !TxMatch::new().to(minter).success(true).any(&txs) {
            return Err(EscrowError::Internal(format!(
                "minter {minter} failed to deploy"
            )));
        }
        tracing::info!(minter = %minter, admin = %admin, "Token minter deployed");
        Ok(minter)
    }

    /// Mint `amount` tokens to `owner`'s wallet, sent by the minter's admin.
    pub fn mint(
        &mut self,
        minter: Address,
        owner: Address,
        amount: Coins,
    ) -> Result<Vec<Transaction>> {
        let admin = MinterData::from_cell(self.contract(&minter)?.1)?.admin;
        let body = token::Mint {
            query_id: self.lt,
            to_owner: owner,
            amount,
        }
        .to_cell()?;
        let txs = self.send(admin, OutboundMessage::new(minter, MINT_VALUE, true, body))?;
        if TxMatch::new()
            .to(minter)
            .op(OP_TOKEN_MINT)
            .success(true)
            .any(&txs)
        {
            self.supply.record_mint(minter, amount)?;
        }
        Ok(txs)
    }

    /// Ask `from_owner`'s wallet to move `amount` tokens to `to_owner`.
    ///
    /// A non-zero `forward_ton_amount` makes the recipient wallet notify
    /// `to_owner`. Excess value returns to `from_owner`.
    pub fn transfer_tokens(
        &mut self,
        minter: Address,
        from_owner: Address,
        to_owner: Address,
        amount: Coins,
        forward_ton_amount: Coins,
    ) -> Result<Vec<Transaction>> {
        let wallet = self.wallet_address(minter, from_owner)?;
        let body = TokenTransfer {
            query_id: self.lt,
            amount,
            destination: to_owner,
            response_destination: Some(from_owner),
            forward_ton_amount,
        }
        .to_cell()?;
        let value = TOKEN_TRANSFER_GAS
            .checked_add(forward_ton_amount)
            .ok_or(EscrowError::AmountOverflow)?;
        self.send(from_owner, OutboundMessage::new(wallet, value, true, body))
    }

    pub fn wallet_address(&self, minter: Address, owner: Address) -> Result<Address> {
        token::wallet_address(minter, owner)
    }

    /// Token balance of `owner`; zero while the wallet is not deployed.
    pub fn token_balance(&self, minter: Address, owner: Address) -> Result<Coins> {
        let wallet = self.wallet_address(minter, owner)?;
        match self.accounts.get(&wallet).map(|a| &a.state) {
            Some(AccountState::Active { code, data }) if token::is_wallet_code(code) => {
                Ok(WalletData::from_cell(data)?.balance)
            }
            _ => Ok(Coins::ZERO),
        }
    }

    /// Sum of all wallet balances under `minter`.
    pub fn token_supply(&self, minter: Address) -> Result<Coins> {
        let mut total = Coins::ZERO;
        for account in self.accounts.values() {
            let AccountState::Active { code, data } = &account.state else {
                continue;
            };
            if !token::is_wallet_code(code) {
                continue;
            }
            let wallet = WalletData::from_cell(data)?;
            if wallet.minter == minter {
                total = total
                    .checked_add(wallet.balance)
                    .ok_or(EscrowError::AmountOverflow)?;
            }
        }
        Ok(total)
    }

    /// Check `Σ wallet balances == Σ minted == minter total_supply`.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on any mismatch.
    pub fn verify_token_supply(&self, minter: Address) -> Result<()> {
        let actual = self.token_supply(minter)?;
        self.supply.verify(&minter, actual)?;
        let on_chain = MinterData::from_cell(self.contract(&minter)?.1)?.total_supply;
        if on_chain != actual {
            return Err(EscrowError::SupplyInvariantViolation {
                reason: format!(
                    "minter {minter} reports {on_chain}, wallets hold {actual}"
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treasuries_are_deterministic_and_funded_once() {
        let mut chain = Blockchain::default();
        let a = chain.treasury("investor");
        assert_eq!(chain.treasury("investor"), a);
        assert_ne!(chain.treasury("worker"), a);
        assert_eq!(chain.balance(&a), Coins::from_coins(1_000_000));
    }

    #[test]
    fn plain_transfer_between_wallets() {
        let mut chain = Blockchain::default();
        let a = chain.treasury("a");
        let b = chain.treasury("b");
        let txs = chain
            .send(a, OutboundMessage::new(b, Coins::from_coins(5), false, Cell::empty()))
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].success);
        assert_eq!(chain.balance(&b), Coins::from_coins(1_000_005));
        assert_eq!(
            chain.balance(&a),
            Coins::from_coins(999_995).saturating_sub(chain.config().forward_fee)
        );
    }

    #[test]
    fn overdraft_rejected_at_send() {
        let mut chain = Blockchain::default();
        let a = chain.treasury("a");
        let err = chain
            .send(
                a,
                OutboundMessage::new(Address::dummy(1), Coins::from_coins(2_000_000), false, Cell::empty()),
            )
            .unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientBalance { .. }));
        assert!(matches!(
            chain.send(
                Address::dummy(5),
                OutboundMessage::new(a, Coins::ZERO, false, Cell::empty())
            ),
            Err(EscrowError::AccountNotFound(_))
        ));
    }

    #[test]
    fn bounceable_message_to_empty_account_bounces() {
        let mut chain = Blockchain::default();
        let a = chain.treasury("a");
        let nobody = Address::dummy(77);
        let txs = chain
            .send(a, OutboundMessage::new(nobody, Coins::from_coins(1), true, Cell::empty()))
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert!(!txs[0].success);
        assert_eq!(txs[0].exit_code, 409);
        assert!(txs[1].bounced);
        assert_eq!(txs[1].to, a);
        assert!(chain.account(&nobody).is_none());
    }

    #[test]
    fn non_bounceable_value_stays_on_empty_account() {
        let mut chain = Blockchain::default();
        let a = chain.treasury("a");
        let nobody = Address::dummy(78);
        chain
            .send(a, OutboundMessage::new(nobody, Coins::from_coins(1), false, Cell::empty()))
            .unwrap();
        assert_eq!(chain.balance(&nobody), Coins::from_coins(1));
        assert_eq!(chain.account(&nobody).unwrap().state, AccountState::Uninit);
    }

    #[test]
    fn mismatched_state_init_rejected() {
        let mut chain = Blockchain::default();
        let a = chain.treasury("a");
        let si = StateInit::new(token::minter_code().unwrap(), Cell::empty());
        let txs = chain
            .send(
                a,
                OutboundMessage::new(Address::dummy(3), Coins::from_coins(1), false, Cell::empty())
                    .with_state_init(si),
            )
            .unwrap();
        assert!(!txs[0].success);
        assert_eq!(txs[0].exit_code, 409);
        assert_eq!(
            chain.account(&Address::dummy(3)).unwrap().state,
            AccountState::Uninit
        );
    }

    #[test]
    fn mint_and_transfer_conserve_supply() {
        let mut chain = Blockchain::default();
        let admin = chain.treasury("admin");
        let alice = chain.treasury("alice");
        let bob = chain.treasury("bob");
        let minter = chain.deploy_token_minter(admin).unwrap();
        chain.mint(minter, alice, Coins::from_coins(100)).unwrap();
        assert_eq!(chain.token_balance(minter, alice).unwrap(), Coins::from_coins(100));

        let txs = chain
            .transfer_tokens(minter, alice, bob, Coins::from_coins(30), Coins::ZERO)
            .unwrap();
        assert!(txs.iter().all(|t| t.success));
        assert_eq!(chain.token_balance(minter, alice).unwrap(), Coins::from_coins(70));
        assert_eq!(chain.token_balance(minter, bob).unwrap(), Coins::from_coins(30));
        chain.verify_token_supply(minter).unwrap();
    }

    #[test]
    fn failed_token_transfer_changes_nothing() {
        let mut chain = Blockchain::default();
        let admin = chain.treasury("admin");
        let alice = chain.treasury("alice");
        let bob = chain.treasury("bob");
        let minter = chain.deploy_token_minter(admin).unwrap();
        chain.mint(minter, alice, Coins::from_coins(10)).unwrap();
        let txs = chain
            .transfer_tokens(minter, alice, bob, Coins::from_coins(30), Coins::ZERO)
            .unwrap();
        assert!(TxMatch::new().exit_code(706).any(&txs));
        assert!(TxMatch::new().to(alice).bounced(true).any(&txs));
        assert_eq!(chain.token_balance(minter, alice).unwrap(), Coins::from_coins(10));
        assert_eq!(chain.token_balance(minter, bob).unwrap(), Coins::ZERO);
        chain.verify_token_supply(minter).unwrap();
    }

    #[test]
    fn stranger_cannot_mint() {
        let mut chain = Blockchain::default();
        let admin = chain.treasury("admin");
        let mallory = chain.treasury("mallory");
        let minter = chain.deploy_token_minter(admin).unwrap();
        let minter_before = chain.account(&minter).cloned().unwrap();
        let body = token::Mint {
            query_id: 0,
            to_owner: mallory,
            amount: Coins::from_coins(1_000),
        }
        .to_cell()
        .unwrap();
        let txs = chain
            .send(mallory, OutboundMessage::new(minter, MINT_VALUE, true, body))
            .unwrap();
        assert!(TxMatch::new().to(minter).exit_code(705).any(&txs));
        // rolled back, fees included
        assert_eq!(chain.account(&minter), Some(&minter_before));
        assert_eq!(chain.token_balance(minter, mallory).unwrap(), Coins::ZERO);
        chain.verify_token_supply(minter).unwrap();
    }
}
