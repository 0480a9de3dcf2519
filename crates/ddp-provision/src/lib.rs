//! Provisioning orchestrator.
//!
//! Sequences device operations (via the transport and codec) and authority
//! operations into one end-to-end workflow: connect, start the provisioning
//! application, initialize NVM, then either have the device generate its own
//! identity and get it certified, or inject externally supplied material.
//! Every step must succeed before the next begins; teardown (stop the
//! command channel, reset the device, close the connection) happens on every
//! exit path.
//!
//! The run is single-threaded and strictly sequential: a new command is
//! never issued before the prior response has been fully decoded, and every
//! wait is bounded by an explicit timeout.

#![forbid(unsafe_code)]

mod config;
mod error;
mod phase;
mod slots;
mod soc;
mod workflow;

pub use config::*;
pub use error::*;
pub use phase::*;
pub use slots::*;
pub use soc::*;
pub use workflow::*;
