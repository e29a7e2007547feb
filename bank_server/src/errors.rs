use bank_common::FeedError;
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;

/// **Everything that can end a session or the server with an error**
///
/// Rejected transfers and malformed requests aren't here:
/// they are answered on the connection, which stays open.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A blocking feed reader failed: {0}")]
    Join(#[from] JoinError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("The connection limiter was closed")]
    LimiterClosed(#[from] AcquireError),
}
