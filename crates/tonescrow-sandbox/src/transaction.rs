//! Transaction records and a matcher for asserting on them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tonescrow_types::{Address, Coins};

/// One executed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Logical time; strictly increasing across the ledger.
    pub lt: u64,
    pub from: Address,
    pub to: Address,
    pub value: Coins,
    /// Leading opcode of the inbound body, `None` for an empty body.
    pub op: Option<u32>,
    /// The message deployed the destination account.
    pub deploy: bool,
    pub success: bool,
    /// 0 on success, otherwise the error's exit code.
    pub exit_code: u32,
    /// The inbound message was a bounce.
    pub bounced: bool,
    /// Messages emitted (including a bounce generated by a failure).
    pub out_count: usize,
    pub executed_at: DateTime<Utc>,
}

/// Partial description of a transaction. Unset fields match anything.
///
/// ```ignore
/// assert!(TxMatch::new().from(investor).to(escrow).deploy(true).success(true).any(&txs));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TxMatch {
    from: Option<Address>,
    to: Option<Address>,
    op: Option<u32>,
    deploy: Option<bool>,
    success: Option<bool>,
    exit_code: Option<u32>,
    bounced: Option<bool>,
    value: Option<Coins>,
}

impl TxMatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    #[must_use]
    pub fn op(mut self, op: u32) -> Self {
        self.op = Some(op);
        self
    }

    #[must_use]
    pub fn deploy(mut self, deploy: bool) -> Self {
        self.deploy = Some(deploy);
        self
    }

    #[must_use]
    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    #[must_use]
    pub fn exit_code(mut self, exit_code: u32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    #[must_use]
    pub fn bounced(mut self, bounced: bool) -> Self {
        self.bounced = Some(bounced);
        self
    }

    #[must_use]
    pub fn value(mut self, value: Coins) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.from.is_none_or(|v| v == tx.from)
            && self.to.is_none_or(|v| v == tx.to)
            && self.op.is_none_or(|v| Some(v) == tx.op)
            && self.deploy.is_none_or(|v| v == tx.deploy)
            && self.success.is_none_or(|v| v == tx.success)
            && self.exit_code.is_none_or(|v| v == tx.exit_code)
            && self.bounced.is_none_or(|v| v == tx.bounced)
            && self.value.is_none_or(|v| v == tx.value)
    }

    /// Whether any transaction in `txs` matches.
    #[must_use]
    pub fn any(&self, txs: &[Transaction]) -> bool {
        txs.iter().any(|tx| self.matches(tx))
    }

    /// Number of matching transactions.
    #[must_use]
    pub fn count(&self, txs: &[Transaction]) -> usize {
        txs.iter().filter(|tx| self.matches(tx)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Transaction {
        Transaction {
            lt: 1,
            from: Address::dummy(1),
            to: Address::dummy(2),
            value: Coins::from_coins(1),
            op: Some(0xcb03_bfaf),
            deploy: false,
            success: false,
            exit_code: 401,
            bounced: false,
            out_count: 1,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn unset_fields_match_anything() {
        assert!(TxMatch::new().matches(&tx()));
    }

    #[test]
    fn every_set_field_must_match() {
        let t = tx();
        assert!(
            TxMatch::new()
                .from(Address::dummy(1))
                .to(Address::dummy(2))
                .op(0xcb03_bfaf)
                .success(false)
                .exit_code(401)
                .matches(&t)
        );
        assert!(!TxMatch::new().success(true).matches(&t));
        assert!(!TxMatch::new().op(1).matches(&t));
        assert!(!TxMatch::new().to(Address::dummy(1)).matches(&t));
    }

    #[test]
    fn any_and_count() {
        let txs = vec![tx(), Transaction { success: true, exit_code: 0, ..tx() }];
        assert!(TxMatch::new().success(true).any(&txs));
        assert_eq!(TxMatch::new().from(Address::dummy(1)).count(&txs), 2);
    }
}
