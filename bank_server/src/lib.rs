//! The XTS Bank Server
//!
//! A TCP front end for [`bank_common::Ledger`]: every connection is a session
//! that names an account and then sends one request per line.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use errors::ServerError;
pub use server::{Server, Shutdown};
