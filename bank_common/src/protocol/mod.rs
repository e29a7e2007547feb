//! The line-based text protocol spoken between a client and the bank server
//!
//! A client first sends its name, then one request per line.
//! Parsing lives in [`request`] and reply rendering in [`format`],
//! so that any front end can share them and we test them in one place.

pub mod constants;
pub mod format;
pub mod request;

pub use format::*;
pub use request::Request;
