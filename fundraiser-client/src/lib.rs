//! Interactive client for a remote fundraising-event service.
//!
//! The client speaks a small binary protocol over one TCP connection: one
//! request, one response, repeat. Each module owns one piece of that:
//!
//! - [`codec`] puts and takes the primitive wire fields (modified UTF-8 text,
//!   `f64`, `i32`, `bool`, and dates as epoch milliseconds).
//! - [`protocol`] defines the request and response shape of every command.
//! - [`session`] caches the event count from the last listing and bounds
//!   index-based requests with it.
//! - [`connection`] owns the socket and the retry-forever reconnect loop.
//! - [`client`] runs the menu, one exchange per selection.
//! - [`console`] and [`display`] validate input lines and render responses.
//! - [`cli`] parses command-line flags.
//!
//! Integration tests drive [`client::Client`] against a scripted in-process
//! server to exercise listing, donations, and reconnects end to end.

pub mod cli;
pub mod client;
pub mod codec;
pub mod connection;
pub mod console;
pub mod display;
pub mod protocol;
pub mod session;
