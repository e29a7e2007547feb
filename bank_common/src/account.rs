use crate::constants::{INITIAL_BALANCE_XTS, INITIAL_DEPOSIT_COMMENT};
use crate::errors::{FeedError, TransferError};
use crate::feed::TransactionFeed;
use crate::tx::{Counterparty, Transaction};
use parking_lot::{Condvar, Mutex, RwLock, RwLockWriteGuard};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// **A stable account handle**
///
/// Assigned by the owning ledger in creation order and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub(crate) u64);

impl AccountId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The part of an account that transfers mutate.
#[derive(Debug)]
struct AccountState {
    balance: i64,
    transactions: Vec<Transaction>,
}

/// **A named account with a balance and an append-only transaction log**
///
/// Balance and log live behind one reader/writer lock, so readers always
/// see them agree: `balance` equals the sum of all deltas in the log.
///
/// Feeds don't wait on that lock. Every account also keeps the number of
/// log entries that have been *published* to feeds, behind a small mutex
/// paired with a condition variable. A transfer bumps it, and wakes the
/// waiters, only after both log entries have been appended and while it
/// still holds the write locks, so a woken feed always finds its entry.
pub struct Account {
    id: AccountId,
    name: Arc<str>,
    state: RwLock<AccountState>,
    published: Mutex<usize>,
    appended: Condvar,
}

impl Account {
    /// Creates an account seeded with the initial deposit.
    ///
    /// Only the ledger creates accounts, which is what keeps ids unique.
    pub(crate) fn new(id: AccountId, name: &str) -> Self {
        let seed = Transaction::new(
            None,
            INITIAL_BALANCE_XTS,
            format!("{INITIAL_DEPOSIT_COMMENT}{name}"),
        );

        Account {
            id,
            name: Arc::from(name),
            state: RwLock::new(AccountState {
                balance: INITIAL_BALANCE_XTS,
                transactions: vec![seed],
            }),
            published: Mutex::new(1),
            appended: Condvar::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// **Current balance in XTS**
    ///
    /// May wait briefly behind an in-progress transfer.
    pub fn balance(&self) -> i64 {
        self.state.read().balance
    }

    /// Number of entries in the transaction log.
    pub fn transaction_count(&self) -> usize {
        self.state.read().transactions.len()
    }

    /// **Consistent point-in-time view of the log and balance**
    ///
    /// `visitor` sees the full log and the balance under one shared lock.
    /// The returned feed starts right after the last entry the visitor saw,
    /// so reading the feed afterwards neither repeats nor skips anything.
    pub fn snapshot<F>(self: &Arc<Self>, visitor: F) -> TransactionFeed
    where
        F: FnOnce(&[Transaction], i64),
    {
        let state = self.state.read();
        visitor(&state.transactions, state.balance);
        TransactionFeed::new(Arc::downgrade(self), state.transactions.len())
    }

    /// **A feed of transactions that haven't happened yet**
    ///
    /// Same as [`Account::snapshot`] with a visitor that does nothing.
    pub fn monitor(self: &Arc<Self>) -> TransactionFeed {
        self.snapshot(|_, _| {})
    }

    /// **Transfers `amount` XTS from this account to `target`**
    ///
    /// A transfer to the account itself is a no-op, regardless of the amount.
    ///
    /// Both accounts are write-locked together, lowest [`AccountId`] first,
    /// so opposite transfers between the same two accounts can't deadlock.
    /// Either both balances and both logs change, or nothing does.
    ///
    /// # Errors
    /// - `amount` is negative, `TransferError::NegativeAmount`;
    /// - `amount` exceeds this account's balance, `TransferError::InsufficientFunds`.
    pub fn transfer(
        &self,
        target: &Account,
        amount: i64,
        comment: &str,
    ) -> Result<(), TransferError> {
        if std::ptr::eq(self, target) {
            return Ok(());
        }

        let (mut mine, mut theirs) = self.write_both(target);

        if amount < 0 {
            return Err(TransferError::NegativeAmount);
        }
        if amount > mine.balance {
            return Err(TransferError::InsufficientFunds {
                available: mine.balance,
                requested: amount,
            });
        }

        mine.balance -= amount;
        theirs.balance += amount;
        mine.transactions.push(Transaction::new(
            Some(target.as_counterparty()),
            -amount,
            comment.to_string(),
        ));
        theirs.transactions.push(Transaction::new(
            Some(self.as_counterparty()),
            amount,
            comment.to_string(),
        ));

        self.publish(mine.transactions.len());
        target.publish(theirs.transactions.len());

        Ok(())
    }

    fn as_counterparty(&self) -> Counterparty {
        Counterparty::new(self.id, Arc::clone(&self.name))
    }

    /// Write-locks both accounts in a total order and returns the guards
    /// as `(self, other)`.
    ///
    /// Ids are only unique within one ledger, so the address breaks ties.
    fn write_both<'a>(
        &'a self,
        other: &'a Account,
    ) -> (
        RwLockWriteGuard<'a, AccountState>,
        RwLockWriteGuard<'a, AccountState>,
    ) {
        if self.lock_rank() < other.lock_rank() {
            let mine = self.state.write();
            let theirs = other.state.write();
            (mine, theirs)
        } else {
            let theirs = other.state.write();
            let mine = self.state.write();
            (mine, theirs)
        }
    }

    fn lock_rank(&self) -> (AccountId, usize) {
        (self.id, self as *const Account as usize)
    }

    /// Must be called with the write lock held and after the log grew to `len`.
    fn publish(&self, len: usize) {
        *self.published.lock() = len;
        self.appended.notify_all();
    }

    /// Blocks until more than `cursor` entries are published.
    ///
    /// Cancellation wins over available entries, so a cancelled feed
    /// never consumes anything.
    pub(crate) fn wait_published(
        &self,
        cursor: usize,
        cancelled: &AtomicBool,
        deadline: Option<Instant>,
    ) -> Result<(), FeedError> {
        let mut published = self.published.lock();
        loop {
            if cancelled.load(Ordering::Acquire) {
                return Err(FeedError::Cancelled);
            }
            if *published > cursor {
                return Ok(());
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .appended
                        .wait_until(&mut published, deadline)
                        .timed_out()
                        && *published <= cursor
                    {
                        return Err(FeedError::TimedOut);
                    }
                }
                None => self.appended.wait(&mut published),
            }
        }
    }

    /// Wakes every waiter so it can re-check its cancellation flag.
    ///
    /// Taking the mutex first means a waiter is either already parked
    /// (and gets woken) or hasn't checked its flag yet.
    pub(crate) fn wake_waiters(&self) {
        let _published = self.published.lock();
        self.appended.notify_all();
    }

    /// Entry `index` of the log, if it has been appended.
    pub(crate) fn transaction_at(&self, index: usize) -> Option<Transaction> {
        self.state.read().transactions.get(index).cloned()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;

    #[test]
    fn new_account_is_seeded() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");

        assert_eq!("alice", alice.name());
        assert_eq!(100, alice.balance());
        assert_eq!(1, alice.transaction_count());

        alice.snapshot(|transactions, balance| {
            assert_eq!(100, balance);
            assert_eq!(1, transactions.len());
            assert_eq!(None, transactions[0].counterparty());
            assert_eq!(100, transactions[0].delta());
            assert_eq!("Initial deposit for alice", transactions[0].comment());
        });
    }

    #[test]
    fn transfer_ok() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        assert_eq!(Ok(()), alice.transfer(&bob, 30, "rent"));

        assert_eq!(70, alice.balance());
        assert_eq!(130, bob.balance());
        assert_eq!(2, alice.transaction_count());
        assert_eq!(2, bob.transaction_count());

        let sent = alice.transaction_at(1).unwrap();
        assert_eq!(Some("bob"), sent.counterparty_name());
        assert_eq!(Some(bob.id()), sent.counterparty().map(Counterparty::id));
        assert_eq!(-30, sent.delta());
        assert_eq!("rent", sent.comment());

        let received = bob.transaction_at(1).unwrap();
        assert_eq!(Some("alice"), received.counterparty_name());
        assert_eq!(30, received.delta());
        assert_eq!("rent", received.comment());
    }

    #[test]
    fn transfer_whole_balance_and_zero_ok() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        assert_eq!(Ok(()), alice.transfer(&bob, 100, "everything"));
        assert_eq!(0, alice.balance());
        assert_eq!(Ok(()), alice.transfer(&bob, 0, "nothing"));
        assert_eq!(0, alice.balance());
        assert_eq!(200, bob.balance());
        assert_eq!(3, alice.transaction_count());
    }

    #[test]
    fn transfer_err_negative_amount() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        assert_eq!(
            Err(TransferError::NegativeAmount),
            alice.transfer(&bob, -1, "steal")
        );

        assert_eq!(100, alice.balance());
        assert_eq!(100, bob.balance());
        assert_eq!(1, alice.transaction_count());
        assert_eq!(1, bob.transaction_count());
    }

    #[test]
    fn transfer_err_insufficient_funds() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        let status = alice.transfer(&bob, 101, "too much");
        assert_eq!(
            Err(TransferError::InsufficientFunds {
                available: 100,
                requested: 101
            }),
            status
        );
        assert_eq!(
            "Not enough funds: 100 XTS available, 101 XTS requested",
            status.unwrap_err().to_string()
        );

        assert_eq!(100, alice.balance());
        assert_eq!(100, bob.balance());
        assert_eq!(1, alice.transaction_count());
        assert_eq!(1, bob.transaction_count());
    }

    #[test]
    fn self_transfer_is_a_no_op() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let mut feed = alice.monitor();

        assert_eq!(Ok(()), alice.transfer(&alice, 50, "to myself"));
        assert_eq!(Ok(()), alice.transfer(&alice, -5, "negative to myself"));
        assert_eq!(Ok(()), alice.transfer(&alice, 500, "more than I have"));

        assert_eq!(100, alice.balance());
        assert_eq!(1, alice.transaction_count());
        assert_eq!(Ok(None), feed.try_next());
    }

    #[test]
    fn transfer_between_ledgers_with_equal_ids() {
        let first = Ledger::new();
        let second = Ledger::new();
        let alice = first.get_or_create("alice");
        let bob = second.get_or_create("bob");
        assert_eq!(alice.id(), bob.id());

        assert_eq!(Ok(()), alice.transfer(&bob, 10, "cross"));
        assert_eq!(Ok(()), bob.transfer(&alice, 20, "back"));

        assert_eq!(110, alice.balance());
        assert_eq!(90, bob.balance());
    }

    #[test]
    fn balance_matches_sum_of_deltas() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");
        let carol = ledger.get_or_create("carol");

        alice.transfer(&bob, 40, "a").unwrap();
        bob.transfer(&carol, 120, "b").unwrap();
        carol.transfer(&alice, 5, "c").unwrap();
        let _ = alice.transfer(&carol, 1_000, "rejected");

        for account in [&alice, &bob, &carol] {
            account.snapshot(|transactions, balance| {
                let sum: i64 = transactions.iter().map(Transaction::delta).sum();
                assert_eq!(balance, sum);
            });
        }
    }
}
