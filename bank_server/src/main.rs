//! The "XTS Bank Server's" entry point.

use bank_common::Ledger;
use bank_server::server::write_port_file;
use bank_server::{Config, Server, ServerError};
use clap::Parser;
use std::env;
use std::sync::Arc;

/// The "XTS Bank Server's" entry point.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "bank_server=info");
    }
    pretty_env_logger::init();

    let config = Config::parse();
    let ledger = Arc::new(Ledger::new());

    let server = Server::bind(&config, Arc::clone(&ledger)).await?;
    let addr = server.local_addr()?;
    println!("Listening at {addr}");

    if let Some(path) = &config.port_file {
        write_port_file(path, addr.port()).await;
    }

    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("Can't listen for Ctrl-C, running until killed: {err}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    log::info!(
        "Closed the ledger with {} account(s) holding {} XTS in total",
        ledger.len(),
        ledger.total_balance()
    );

    Ok(())
}
