//! The accept loop

use crate::config::Config;
use crate::errors::ServerError;
use crate::handlers::serve_client;
use bank_common::Ledger;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

/// Pause after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// **A signal that tells sessions to wrap up**
///
/// Also fires if the server that owns the sending side is gone.
#[derive(Clone, Debug)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    /// Returns a pair of a trigger and the signal it fires.
    pub fn channel() -> (watch::Sender<bool>, Shutdown) {
        let (sender, receiver) = watch::channel(false);
        (sender, Shutdown { receiver })
    }

    /// Waits until shutdown is requested.
    pub async fn recv(&mut self) {
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }
}

/// **A bound listener plus the ledger it serves**
///
/// The ledger is shared with every session through an [`Arc`];
/// there is no global state.
/// A semaphore caps the number of sessions served at the same time.
pub struct Server {
    listener: TcpListener,
    ledger: Arc<Ledger>,
    sessions: Arc<Semaphore>,
    max_connections: u32,
}

impl Server {
    /// Binds to the configured address.
    ///
    /// # Errors
    /// - The address can't be bound, `ServerError::Io`.
    pub async fn bind(config: &Config, ledger: Arc<Ledger>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((config.host, config.port)).await?;

        Ok(Server {
            listener,
            ledger,
            sessions: Arc::new(Semaphore::new(config.max_connections as usize)),
            max_connections: config.max_connections,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// **Accepts and serves clients until `shutdown` completes**
    ///
    /// Then tells open sessions to stop and waits for all of them to end.
    /// Each session runs in its own task; a connection is only accepted
    /// once a session slot is free.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let (stop, signal) = Shutdown::channel();
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&self.sessions).acquire_owned() => permit?,
                _ = &mut shutdown => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        log::error!("Failed to accept a connection: {err}");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let ledger = Arc::clone(&self.ledger);
            let signal = signal.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, ledger, signal).await;
                drop(permit);
            });
        }

        let open = self.max_connections as usize - self.sessions.available_permits();
        log::info!("Shutting down; waiting for {open} open session(s)");
        let _ = stop.send(true);
        let _all = self.sessions.acquire_many(self.max_connections).await?;

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ledger: Arc<Ledger>,
    shutdown: Shutdown,
) {
    match stream.local_addr() {
        Ok(local) => log::info!("Connected {peer} --> {local}"),
        Err(_) => log::info!("Connected {peer}"),
    }

    let (reader, writer) = stream.into_split();
    match serve_client(BufReader::new(reader), writer, ledger, shutdown).await {
        Ok(Some(name)) => log::info!("Disconnected {name} ({peer})"),
        Ok(None) => log::info!("Disconnected {peer} before naming an account"),
        Err(err) => log::warn!("Session with {peer} ended with an error: {err}"),
    }
}

/// **Writes the bound port to `path`**
///
/// Failing to do so doesn't stop the server; it is logged instead.
pub async fn write_port_file(path: &Path, port: u16) {
    if let Err(err) = tokio::fs::write(path, port.to_string()).await {
        log::error!("Unable to store port to file {}: {}", path.display(), err);
    }
}
