/// Every account starts with this many XTS, booked as its first transaction.
pub const INITIAL_BALANCE_XTS: i64 = 100;

/// The currency unit of all balances.
pub const CURRENCY: &str = "XTS";

/// Comment of the seed transaction, followed by the account's name.
pub const INITIAL_DEPOSIT_COMMENT: &str = "Initial deposit for ";
