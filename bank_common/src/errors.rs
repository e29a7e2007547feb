use thiserror::Error;

/// **Why a transfer was rejected**
///
/// Both variants are returned before any state is touched,
/// so a rejected transfer leaves both accounts exactly as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Required xts is a negative number")]
    NegativeAmount,

    #[error("Not enough funds: {available} XTS available, {requested} XTS requested")]
    InsufficientFunds { available: i64, requested: i64 },
}

/// **Why a feed read returned without a transaction**
///
/// None of these advance the feed's cursor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedError {
    #[error("The feed was cancelled")]
    Cancelled,

    #[error("Timed out waiting for the next transaction")]
    TimedOut,

    #[error("The watched account no longer exists")]
    AccountClosed,
}

/// **A malformed request line**
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Empty request")]
    Empty,

    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("The {command} command is missing its <{argument}> argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Invalid {argument}: '{value}' is not an integer in range")]
    InvalidNumber {
        argument: &'static str,
        value: String,
    },

    #[error("Account name is not valid: {0}")]
    InvalidName(&'static str),
}
