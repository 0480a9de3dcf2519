//! DDP command/response framing.
//!
//! The provisioning application running on the device speaks a small binary
//! request/response protocol over the command channel. Every frame is a
//! fixed little-endian header (operation tag, body length) immediately
//! followed by the body; responses carry a 32-bit status and an optional
//! length-prefixed payload.
//!
//! This crate is pure transformation: no I/O, no retries, no timeouts.
//! Encoding dispatches on a typed [`Command`] variant; decoding is keyed by
//! the [`Operation`] the caller issued, since the device never echoes the
//! tag back.

#![forbid(unsafe_code)]

mod command;
mod error;
mod response;

pub use command::*;
pub use error::*;
pub use response::*;

/// Fixed frame header length in bytes (operation tag + body length).
pub const FRAME_HEADER_LEN: usize = 4;

/// Fixed response header length in bytes (status + body length).
pub const RESPONSE_HEADER_LEN: usize = 6;
