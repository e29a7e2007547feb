//! Command-line configuration

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 64;

/// **XTS Bank Server**
///
/// Serves the ledger over a line-based TCP protocol.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "bank_server", version, about, long_about = None)]
pub struct Config {
    /// TCP port to listen on; 0 picks a free one
    #[arg(default_value_t = 0)]
    pub port: u16,

    /// File to write the bound port number to
    pub port_file: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Most clients served at once; further clients wait to be accepted
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        value_parser = clap::value_parser!(u32).range(1..=10_000)
    )]
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 0,
            port_file: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}
