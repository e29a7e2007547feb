//! Rendering of replies, one line at a time and without the trailing newline

use crate::constants::CURRENCY;
use crate::protocol::constants::{NO_COUNTERPARTY, TRANSACTIONS_HEADER};
use crate::tx::Transaction;

/// `Hi <name>`
pub fn greet(name: &str) -> String {
    format!("Hi {name}")
}

/// `<counterparty or ->\t<delta>\t<comment>`
pub fn format_transaction(tx: &Transaction) -> String {
    format!(
        "{}\t{}\t{}",
        tx.counterparty_name().unwrap_or(NO_COUNTERPARTY),
        tx.delta(),
        tx.comment()
    )
}

/// `===== BALANCE: <balance> XTS =====`
pub fn format_balance_summary(balance: i64) -> String {
    format!("===== BALANCE: {balance} {CURRENCY} =====")
}

/// **The reply to `transactions <count>`**
///
/// A header, the last `count` transactions (all of them if there are fewer),
/// and the balance summary.
pub fn format_listing(transactions: &[Transaction], balance: i64, count: usize) -> Vec<String> {
    let skip = transactions.len().saturating_sub(count);

    std::iter::once(TRANSACTIONS_HEADER.to_string())
        .chain(transactions[skip..].iter().map(format_transaction))
        .chain(std::iter::once(format_balance_summary(balance)))
        .collect()
}
