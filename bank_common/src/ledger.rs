use crate::account::{Account, AccountId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup tables behind the ledger's lock; only ever grow.
#[derive(Debug, Default)]
struct Registry {
    by_name: HashMap<String, Arc<Account>>,
    by_id: Vec<Arc<Account>>,
}

/// **The registry of all accounts, keyed by name**
///
/// Accounts are created lazily on first reference and live as long as the ledger.
/// The registry lock is held only for the lookup-or-insert step and is released
/// before the caller touches the returned account.
#[derive(Debug, Default)]
pub struct Ledger {
    registry: Mutex<Registry>,
}

impl Ledger {
    /// Returns an empty ledger.
    pub fn new() -> Self {
        Ledger::default()
    }

    /// **Returns the account called `name`, creating it if needed**
    ///
    /// A new account starts with a balance of 100 XTS.
    /// Concurrent calls with the same new name all get the same account.
    pub fn get_or_create(&self, name: &str) -> Arc<Account> {
        let mut registry = self.registry.lock();

        if let Some(account) = registry.by_name.get(name) {
            return Arc::clone(account);
        }

        let id = AccountId(registry.by_id.len() as u64);
        let account = Arc::new(Account::new(id, name));
        registry.by_id.push(Arc::clone(&account));
        registry
            .by_name
            .insert(name.to_string(), Arc::clone(&account));

        account
    }

    /// Returns the account called `name` without creating it.
    pub fn get(&self, name: &str) -> Option<Arc<Account>> {
        self.registry.lock().by_name.get(name).cloned()
    }

    /// Resolves an [`AccountId`], e.g. a transaction's counterparty.
    pub fn account(&self, id: AccountId) -> Option<Arc<Account>> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.registry.lock().by_id.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.registry.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All accounts in creation order.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.registry.lock().by_id.clone()
    }

    /// **Sum of all balances**
    ///
    /// Transfers never change it, so outside of in-flight transfers it is
    /// always `100 * self.len()`.
    pub fn total_balance(&self) -> i64 {
        self.accounts().iter().map(|account| account.balance()).sum()
    }
}
