//! The XTS bank's core
//!
//! A [`Ledger`] of named [`Account`]s, each with a balance and an append-only log of
//! [`Transaction`]s, atomic transfers between accounts under concurrent access,
//! and [`TransactionFeed`]s that block until an account sees a new transaction.
//!
//! The [`protocol`] module holds the text protocol that front ends speak on top of it.

pub mod account;
pub mod constants;
pub mod errors;
pub mod feed;
pub mod ledger;
pub mod protocol;
pub mod tx;
pub mod validation;

pub use account::{Account, AccountId};
pub use errors::{FeedError, RequestError, TransferError};
pub use feed::{FeedCanceller, TransactionFeed};
pub use ledger::Ledger;
pub use tx::{Counterparty, Transaction};
