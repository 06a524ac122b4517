//! # sweepbox-net
//!
//! The remote command surface: a TCP server speaking a line-delimited text
//! protocol. Each request line parses into a typed [`Request`], is handled
//! synchronously by the daemon's dispatcher, and answers with a single
//! `OK`/`ERR` line. The grammar lives entirely in [`protocol`]; the rest of
//! the system only sees typed requests.
//!
//! [`Request`]: sweepbox_types::Request

pub mod framing;
pub mod protocol;
pub mod server;

pub use server::{CommandHandler, CommandServer};
