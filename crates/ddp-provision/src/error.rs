//! Orchestrator error taxonomy.
//!
//! Every variant aborts the current run; nothing is retried automatically.
//! Retry, if desired, is an operator-level re-run of the whole sequence.

use ddp_authority::AuthorityError;
use ddp_protocol::{CodecError, Operation, Status};
use ddp_transport::{ChannelError, TransportError};
use thiserror::Error;

/// Result type for provisioning runs.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that abort a provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Transport-level failure (timeout or channel fault during exchange).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed frame.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Channel fault outside an exchange (connect, reset, image load).
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The device answered a step with an unexpected status.
    #[error("device reported status {status} during {step}")]
    Protocol {
        /// The step that failed.
        step: Operation,
        /// Status the device reported.
        status: Status,
    },

    /// The device reported success but omitted the expected payload.
    #[error("device returned no payload for {step}")]
    MissingPayload {
        /// The step whose payload is missing.
        step: Operation,
    },

    /// Authority-side failure during issuance.
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// Unsupported device variant or missing operator input.
    #[error("configuration error: {detail}")]
    Config {
        /// What is wrong.
        detail: String,
    },
}
