//! Shared fixtures for the escrow integration tests.

#![allow(dead_code)]

use tonescrow_contract::EscrowClient;
use tonescrow_sandbox::{Blockchain, Transaction, TxMatch};
use tonescrow_types::{Address, Coins, EscrowConfig, GasConfig, Salt};
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once. Set `RUST_LOG=debug` to see the
/// message flow.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn coins(s: &str) -> Coins {
    s.parse().expect("valid coin literal")
}

/// The three parties of one deal, each a funded treasury.
pub struct Parties {
    pub investor: Address,
    pub worker: Address,
    pub guarantor: Address,
}

impl Parties {
    pub fn new(chain: &mut Blockchain) -> Self {
        Self {
            investor: chain.treasury("investor"),
            worker: chain.treasury("worker"),
            guarantor: chain.treasury("guarantor"),
        }
    }

    /// The 100 + 10 deal used throughout the tests.
    pub fn deal(&self, wallet: Option<Address>) -> EscrowConfig {
        EscrowConfig {
            investor: self.investor,
            worker: self.worker,
            guarantor: self.guarantor,
            amount: Coins::from_coins(100),
            amount_interest: Coins::from_coins(10),
            wallet,
        }
    }
}

/// A fresh escrow instance with default gas and a random salt.
pub fn new_client() -> EscrowClient {
    EscrowClient::new(GasConfig::default(), Salt::random()).expect("client builds")
}

/// Deploy and construct in one message, asserting success.
pub fn deploy(
    chain: &mut Blockchain,
    client: &EscrowClient,
    from: Address,
    config: &EscrowConfig,
) -> Vec<Transaction> {
    let msg = client.deploy_message(config).expect("deploy message");
    let txs = chain.send(from, msg).expect("send deploy");
    assert!(
        TxMatch::new()
            .from(from)
            .to(client.address())
            .deploy(true)
            .success(true)
            .any(&txs),
        "deploy failed: {txs:#?}"
    );
    txs
}

/// The escrow's own transaction for the first message it received.
pub fn escrow_tx<'a>(txs: &'a [Transaction], escrow: Address) -> &'a Transaction {
    txs.iter()
        .find(|t| t.to == escrow && !t.bounced)
        .expect("escrow executed a transaction")
}
