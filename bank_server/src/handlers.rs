//! Session handling: one client, one account, one request per line

use crate::errors::ServerError;
use crate::server::Shutdown;
use bank_common::protocol::constants::{GREETING, OK};
use bank_common::protocol::{format_listing, format_transaction, greet, Request};
use bank_common::validation;
use bank_common::{Account, FeedError, Ledger, Transaction, TransactionFeed};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

/// **Serves one client until it disconnects or the server shuts down**
///
/// Asks for the client's name, creates its account on first use,
/// and then answers requests. `monitor` streams for the rest of the session.
///
/// Returns the client's name, or `None` if it left before giving one.
///
/// # Errors
/// Only I/O failures and broken feed readers end a session with an error;
/// rejected transfers and malformed requests are answered and the session goes on.
pub async fn serve_client<R, W>(
    reader: R,
    mut writer: W,
    ledger: Arc<Ledger>,
    mut shutdown: Shutdown,
) -> Result<Option<String>, ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = RequestLines::new(reader);

    let name = match read_name(&mut lines, &mut writer, &mut shutdown).await? {
        Some(name) => name,
        None => return Ok(None),
    };
    let account = ledger.get_or_create(&name);
    write_lines(&mut writer, &[greet(&name)]).await?;

    while let Some(line) = next_line(&mut lines, &mut shutdown).await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match line.parse::<Request>() {
            Ok(Request::Balance) => vec![account.balance().to_string()],
            Ok(Request::Transactions { count }) => listing(&account, count).0,
            Ok(Request::Monitor { count }) => {
                let (reply, feed) = listing(&account, count);
                write_lines(&mut writer, &reply).await?;
                stream_feed(feed, &mut lines, &mut writer, &mut shutdown).await?;
                break;
            }
            Ok(Request::Transfer {
                recipient,
                amount,
                comment,
            }) => {
                let target = ledger.get_or_create(&recipient);
                match account.transfer(&target, amount, &comment) {
                    Ok(()) => vec![OK.to_string()],
                    Err(err) => {
                        log::debug!("{name} -> {recipient}, {amount}: {err}");
                        vec![err.to_string()]
                    }
                }
            }
            Err(err) => vec![err.to_string()],
        };

        write_lines(&mut writer, &reply).await?;
    }

    Ok(Some(name))
}

/// Greets the client and reads its name: the first word of the first non-blank line.
async fn read_name<R, W>(
    lines: &mut RequestLines<R>,
    writer: &mut W,
    shutdown: &mut Shutdown,
) -> Result<Option<String>, ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_lines(writer, &[GREETING.to_string()]).await?;

    while let Some(line) = next_line(lines, shutdown).await? {
        let Some(name) = line.split_whitespace().next() else {
            continue;
        };

        match validation::is_valid_name(name) {
            None => return Ok(Some(name.to_string())),
            Some(reason) => {
                log::warn!("Rejected account name \"{}\": {}", name.escape_debug(), reason);
                write_lines(writer, &[reason.to_string(), GREETING.to_string()]).await?;
            }
        }
    }

    Ok(None)
}

/// **Request lines read as raw bytes**
///
/// Comments are opaque text, so bytes that aren't valid UTF-8 are replaced
/// with U+FFFD instead of failing the read and ending the session.
struct RequestLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R> RequestLines<R>
where
    R: AsyncBufRead + Unpin,
{
    fn new(reader: R) -> Self {
        RequestLines {
            reader,
            buf: Vec::new(),
        }
    }

    /// The next line without its line ending; `None` at end of input.
    ///
    /// Cancel safe: bytes of an interrupted read stay in `buf`
    /// and the next call picks up where it left off.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// The next request line; `None` once the client hangs up or the server stops.
async fn next_line<R>(
    lines: &mut RequestLines<R>,
    shutdown: &mut Shutdown,
) -> Result<Option<String>, ServerError>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = shutdown.recv() => Ok(None),
    }
}

/// Renders the last `count` transactions and returns a feed that continues after them.
fn listing(account: &Arc<Account>, count: usize) -> (Vec<String>, TransactionFeed) {
    let mut reply = Vec::new();
    let feed = account.snapshot(|transactions, balance| {
        reply = format_listing(transactions, balance, count);
    });

    (reply, feed)
}

/// **Writes every new transaction of the feed to the client**
///
/// `wait_next` blocks, so it runs on the blocking pool. Input from the client
/// is ignored until it hangs up; then, or on shutdown, the feed is cancelled
/// and its reader joined before returning.
async fn stream_feed<R, W>(
    feed: TransactionFeed,
    lines: &mut RequestLines<R>,
    writer: &mut W,
    shutdown: &mut Shutdown,
) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let canceller = feed.canceller();
    let mut pending = wait_next_blocking(feed);

    loop {
        tokio::select! {
            joined = &mut pending => {
                let (feed, next) = joined?;
                match next {
                    Ok(tx) => {
                        write_lines(writer, &[format_transaction(&tx)]).await?;
                        pending = wait_next_blocking(feed);
                    }
                    Err(FeedError::Cancelled) => return Ok(()),
                    Err(err) => return Err(err.into()),
                }
            }
            line = lines.next_line() => {
                if let Ok(Some(_)) = line {
                    continue;
                }
                canceller.cancel();
                let (_feed, _cancelled) = pending.await?;
                return line.map(|_| ()).map_err(ServerError::from);
            }
            _ = shutdown.recv() => {
                canceller.cancel();
                let (_feed, _cancelled) = pending.await?;
                return Ok(());
            }
        }
    }
}

fn wait_next_blocking(
    mut feed: TransactionFeed,
) -> JoinHandle<(TransactionFeed, Result<Transaction, FeedError>)> {
    tokio::task::spawn_blocking(move || {
        let next = feed.wait_next();
        (feed, next)
    })
}

async fn write_lines<W>(writer: &mut W, lines: &[String]) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;

    Ok(())
}
