use crate::account::Account;
use crate::errors::FeedError;
use crate::tx::Transaction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// **A per-consumer cursor over one account's transaction log**
///
/// Created by [`Account::snapshot`] or [`Account::monitor`].
/// Each feed delivers every entry from its start position exactly once and in log order;
/// feeds on the same account never interfere with each other.
///
/// The feed only holds a weak reference, so it never keeps the account alive.
#[derive(Debug)]
pub struct TransactionFeed {
    account: Weak<Account>,
    cursor: usize,
    cancelled: Arc<AtomicBool>,
}

impl TransactionFeed {
    pub(crate) fn new(account: Weak<Account>, cursor: usize) -> Self {
        TransactionFeed {
            account,
            cursor,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// How many log entries lie before the next one this feed delivers.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// **Blocks until the next transaction is appended, then returns it**
    ///
    /// While parked, the wait holds the account alive, so dropping the ledger
    /// doesn't wake it. Use [`TransactionFeed::canceller`] to get such a waiter out;
    /// `FeedError::AccountClosed` is only reported when a wait starts after the
    /// account is gone.
    ///
    /// # Errors
    /// - The feed was cancelled, `FeedError::Cancelled`;
    /// - The account is gone, `FeedError::AccountClosed`.
    pub fn wait_next(&mut self) -> Result<Transaction, FeedError> {
        self.next_before(None)
    }

    /// **Like [`TransactionFeed::wait_next`], but gives up after `timeout`**
    ///
    /// # Errors
    /// - Nothing was appended in time, `FeedError::TimedOut`;
    /// - The feed was cancelled, `FeedError::Cancelled`;
    /// - The account is gone, `FeedError::AccountClosed`.
    pub fn wait_next_timeout(&mut self, timeout: Duration) -> Result<Transaction, FeedError> {
        self.next_before(Some(Instant::now() + timeout))
    }

    /// **Returns the next transaction if there already is one**
    ///
    /// Never blocks on new transactions.
    pub fn try_next(&mut self) -> Result<Option<Transaction>, FeedError> {
        match self.next_before(Some(Instant::now())) {
            Ok(tx) => Ok(Some(tx)),
            Err(FeedError::TimedOut) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// **A token that cancels this feed from another thread**
    pub fn canceller(&self) -> FeedCanceller {
        FeedCanceller {
            account: self.account.clone(),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    fn next_before(&mut self, deadline: Option<Instant>) -> Result<Transaction, FeedError> {
        let account = self.account.upgrade().ok_or(FeedError::AccountClosed)?;
        account.wait_published(self.cursor, &self.cancelled, deadline)?;

        // Published entries are never removed, so this can't miss.
        let tx = account
            .transaction_at(self.cursor)
            .ok_or(FeedError::AccountClosed)?;
        self.cursor += 1;

        Ok(tx)
    }
}

/// **Cancels a [`TransactionFeed`]**
///
/// Once cancelled, every current and future wait on that feed returns
/// `FeedError::Cancelled` without consuming an entry.
/// Other feeds on the same account keep working.
#[derive(Clone, Debug)]
pub struct FeedCanceller {
    account: Weak<Account>,
    cancelled: Arc<AtomicBool>,
}

impl FeedCanceller {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(account) = self.account.upgrade() {
            account.wake_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use std::thread;

    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn monitor_delivers_each_transfer_once_in_order() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");
        let carol = ledger.get_or_create("carol");

        let mut feed = alice.monitor();
        assert_eq!(1, feed.cursor());

        alice.transfer(&bob, 10, "first").unwrap();
        bob.transfer(&carol, 50, "unrelated").unwrap();
        carol.transfer(&alice, 20, "second").unwrap();
        bob.transfer(&carol, 5, "unrelated too").unwrap();
        alice.transfer(&carol, 1, "third").unwrap();

        let first = feed.wait_next().unwrap();
        assert_eq!(("first", -10), (first.comment(), first.delta()));
        let second = feed.wait_next().unwrap();
        assert_eq!(("second", 20), (second.comment(), second.delta()));
        assert_eq!(Some("carol"), second.counterparty_name());
        let third = feed.wait_next().unwrap();
        assert_eq!(("third", -1), (third.comment(), third.delta()));

        assert_eq!(Ok(None), feed.try_next());
        assert_eq!(4, feed.cursor());
    }

    #[test]
    fn snapshot_continues_without_gaps_or_duplicates() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        alice.transfer(&bob, 1, "before").unwrap();

        let mut seen = Vec::new();
        let mut feed = alice.snapshot(|transactions, balance| {
            assert_eq!(99, balance);
            seen.extend(transactions.iter().map(|tx| tx.comment().to_string()));
        });
        assert_eq!(vec!["Initial deposit for alice", "before"], seen);

        alice.transfer(&bob, 2, "after").unwrap();

        assert_eq!("after", feed.wait_next().unwrap().comment());
        assert_eq!(Ok(None), feed.try_next());
    }

    #[test]
    fn feeds_have_independent_cursors() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        let mut early = alice.monitor();
        alice.transfer(&bob, 1, "one").unwrap();
        let mut late = alice.monitor();
        alice.transfer(&bob, 2, "two").unwrap();

        assert_eq!("one", early.wait_next().unwrap().comment());
        assert_eq!("two", late.wait_next().unwrap().comment());
        assert_eq!("two", early.wait_next().unwrap().comment());
        assert_eq!(Ok(None), early.try_next());
        assert_eq!(Ok(None), late.try_next());
    }

    #[test]
    fn wait_next_blocks_until_a_transfer_happens() {
        let ledger = Arc::new(Ledger::new());
        let alice = ledger.get_or_create("alice");
        let mut feed = alice.monitor();

        let consumer = thread::spawn(move || {
            (0..3)
                .map(|_| feed.wait_next_timeout(PATIENCE).map(|tx| tx.delta()))
                .collect::<Vec<_>>()
        });

        let bob = ledger.get_or_create("bob");
        for amount in 1..=3 {
            thread::sleep(Duration::from_millis(10));
            bob.transfer(&alice, amount, "gift").unwrap();
        }

        assert_eq!(vec![Ok(1), Ok(2), Ok(3)], consumer.join().unwrap());
    }

    #[test]
    fn concurrent_consumers_each_see_everything() {
        let ledger = Arc::new(Ledger::new());
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let mut feed = alice.monitor();
                thread::spawn(move || {
                    (0..20)
                        .map(|_| feed.wait_next_timeout(PATIENCE).unwrap().comment().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for i in 0..10 {
            alice.transfer(&bob, 1, &format!("out {i}")).unwrap();
            bob.transfer(&alice, 1, &format!("in {i}")).unwrap();
        }

        let expected: Vec<String> = (0..10)
            .flat_map(|i| [format!("out {i}"), format!("in {i}")])
            .collect();
        for consumer in consumers {
            assert_eq!(expected, consumer.join().unwrap());
        }
    }

    #[test]
    fn timeout_does_not_consume() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");
        let mut feed = alice.monitor();

        assert_eq!(
            Err(FeedError::TimedOut),
            feed.wait_next_timeout(Duration::from_millis(20))
        );
        assert_eq!(1, feed.cursor());

        bob.transfer(&alice, 7, "late").unwrap();
        assert_eq!(7, feed.wait_next_timeout(PATIENCE).unwrap().delta());
    }

    #[test]
    fn cancel_wakes_a_blocked_waiter() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let mut feed = alice.monitor();
        let canceller = feed.canceller();

        let consumer = thread::spawn(move || {
            let result = feed.wait_next();
            (result, feed.cursor())
        });

        thread::sleep(Duration::from_millis(20));
        canceller.cancel();

        assert!(canceller.is_cancelled());
        assert_eq!((Err(FeedError::Cancelled), 1), consumer.join().unwrap());
    }

    #[test]
    fn cancelled_feed_skips_nothing_for_others() {
        let ledger = Ledger::new();
        let alice = ledger.get_or_create("alice");
        let bob = ledger.get_or_create("bob");

        let mut cancelled = alice.monitor();
        let mut active = alice.monitor();
        cancelled.canceller().cancel();

        alice.transfer(&bob, 3, "still delivered").unwrap();

        assert_eq!(Err(FeedError::Cancelled), cancelled.wait_next());
        assert_eq!(Err(FeedError::Cancelled), cancelled.try_next());
        assert_eq!(1, cancelled.cursor());
        assert_eq!("still delivered", active.wait_next().unwrap().comment());
    }

    #[test]
    fn parked_waiter_survives_dropped_ledger_until_cancelled() {
        let ledger = Ledger::new();
        let mut feed = ledger.get_or_create("alice").monitor();
        let canceller = feed.canceller();

        let consumer = thread::spawn(move || {
            let result = feed.wait_next();
            (result, feed.cursor())
        });

        thread::sleep(Duration::from_millis(20));
        drop(ledger);
        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());

        canceller.cancel();
        assert_eq!((Err(FeedError::Cancelled), 1), consumer.join().unwrap());
    }

    #[test]
    fn feed_outliving_its_ledger_reports_closed_account() {
        let ledger = Ledger::new();
        let mut feed = ledger.get_or_create("alice").monitor();
        drop(ledger);

        assert_eq!(Err(FeedError::AccountClosed), feed.wait_next());
    }
}
