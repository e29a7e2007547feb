use crate::account::AccountId;
use std::sync::Arc;

/// **The other side of a transfer**
///
/// A non-owning back reference: it only names the counterparty
/// and can be resolved back through [`crate::ledger::Ledger::account`].
/// It doesn't keep the counterparty's account alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counterparty {
    id: AccountId,
    name: Arc<str>,
}

impl Counterparty {
    pub(crate) fn new(id: AccountId, name: Arc<str>) -> Self {
        Counterparty { id, name }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// **A transaction type**
///
/// One signed balance change of a single account.
/// Applying all of an account's transactions in order, starting from zero,
/// rebuilds that account's balance.
///
/// Transactions are immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    counterparty: Option<Counterparty>,
    delta: i64,
    comment: String,
}

impl Transaction {
    pub(crate) fn new(counterparty: Option<Counterparty>, delta: i64, comment: String) -> Self {
        Transaction {
            counterparty,
            delta,
            comment,
        }
    }

    /// `None` for the initial deposit.
    pub fn counterparty(&self) -> Option<&Counterparty> {
        self.counterparty.as_ref()
    }

    pub fn counterparty_name(&self) -> Option<&str> {
        self.counterparty.as_ref().map(Counterparty::name)
    }

    /// The amount added to the owning account; negative for the sender's entry.
    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}
