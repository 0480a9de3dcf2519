//! Test doubles and fixtures for the DDP provisioning stack.
//!
//! This crate provides:
//!
//! - [`ScriptedChannel`] - a programmable [`ddp_transport::DeviceChannel`]
//!   that replays canned device responses and records everything the run
//!   did to it
//! - [`LoopbackChannel`] - a channel that echoes each command body back as a
//!   successful response
//! - [`MemorySigner`] - a deterministic in-memory signer whose
//!   "certificates" are CBOR documents that tests can decode and link-check
//! - [`init_test_tracing`] - tracing setup for test output
//!
//! Nothing here is intended for production use.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod channel;
mod signer;
mod tracing_config;

pub use channel::*;
pub use signer::*;
pub use tracing_config::*;
