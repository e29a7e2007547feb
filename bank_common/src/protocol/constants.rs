/// Commands

pub const BALANCE: &str = "balance";
pub const TRANSACTIONS: &str = "transactions";
pub const MONITOR: &str = "monitor";
pub const TRANSFER: &str = "transfer";

/// Fixed replies

pub const GREETING: &str = "What is your name?";
pub const OK: &str = "OK";
pub const TRANSACTIONS_HEADER: &str = "CPTY\tBAL\tCOMM";
pub const NO_COUNTERPARTY: &str = "-";
