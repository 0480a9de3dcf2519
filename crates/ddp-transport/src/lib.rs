//! Request/response transport to a provisioned device.
//!
//! The command channel is single-peer, ordered and unpipelined: exactly one
//! request may be outstanding, and the response must be fully consumed before
//! the next request is sent. Every suspension point is bounded by an explicit
//! timeout; a timeout is terminal for the run, never silently retried here.
//!
//! The underlying debug-probe primitives are abstracted behind the
//! [`DeviceChannel`] capability so that the transport (and everything above
//! it) never assumes a concrete probe mechanism.

#![forbid(unsafe_code)]

mod channel;
mod transport;

pub use channel::*;
pub use transport::*;
