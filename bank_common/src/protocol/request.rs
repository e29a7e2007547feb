//! Parsing of request lines

use crate::errors::RequestError;
use crate::protocol::constants::{BALANCE, MONITOR, TRANSACTIONS, TRANSFER};
use crate::validation;
use std::str::FromStr;

/// **One client request**
///
/// Parsed from a single line with [`str::parse`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// `balance`
    Balance,

    /// `transactions <count>`: the last `count` transactions and the balance
    Transactions { count: usize },

    /// `monitor <count>`: like `transactions`, then every new transaction as it happens
    Monitor { count: usize },

    /// `transfer <recipient> <amount> <comment...>`
    ///
    /// The comment is the rest of the line after the single separator
    /// that follows the amount, and may be empty or contain spaces.
    Transfer {
        recipient: String,
        amount: i64,
        comment: String,
    },
}

impl FromStr for Request {
    type Err = RequestError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (command, rest) = next_word(line).ok_or(RequestError::Empty)?;

        match command {
            BALANCE => Ok(Request::Balance),
            TRANSACTIONS => Ok(Request::Transactions {
                count: parse_count(TRANSACTIONS, rest)?,
            }),
            MONITOR => Ok(Request::Monitor {
                count: parse_count(MONITOR, rest)?,
            }),
            TRANSFER => parse_transfer(rest),
            _ => Err(RequestError::UnknownCommand(command.to_string())),
        }
    }
}

/// Splits off the first whitespace-delimited word.
///
/// The remainder starts with the separator that ended the word, if any.
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }

    match input.find(char::is_whitespace) {
        Some(end) => Some(input.split_at(end)),
        None => Some((input, "")),
    }
}

fn parse_count(command: &'static str, rest: &str) -> Result<usize, RequestError> {
    let (word, _) = next_word(rest).ok_or(RequestError::MissingArgument {
        command,
        argument: "count",
    })?;

    word.parse().map_err(|_| RequestError::InvalidNumber {
        argument: "count",
        value: word.to_string(),
    })
}

fn parse_transfer(rest: &str) -> Result<Request, RequestError> {
    let (recipient, rest) = next_word(rest).ok_or(RequestError::MissingArgument {
        command: TRANSFER,
        argument: "recipient",
    })?;
    if let Some(reason) = validation::is_valid_name(recipient) {
        return Err(RequestError::InvalidName(reason));
    }

    let (amount, rest) = next_word(rest).ok_or(RequestError::MissingArgument {
        command: TRANSFER,
        argument: "amount",
    })?;
    let amount = amount.parse().map_err(|_| RequestError::InvalidNumber {
        argument: "amount",
        value: amount.to_string(),
    })?;

    // Drop exactly one separator; the comment keeps any further spacing.
    let mut comment = rest.chars();
    comment.next();

    Ok(Request::Transfer {
        recipient: recipient.to_string(),
        amount,
        comment: comment.as_str().to_string(),
    })
}
