//! Authority error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::signer::SignerError;

/// Result type for authority operations.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

/// Errors reported by the authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The certificate store has not been set up.
    #[error("authority store is not initialized at {path}")]
    NotInitialized {
        /// Store directory that was probed.
        path: PathBuf,
    },

    /// No device OID is persisted in the store.
    #[error("no device OID configured in the authority store")]
    MissingOid,

    /// The incoming certificate request could not be understood.
    #[error("malformed certificate request: {detail}")]
    MalformedRequest {
        /// What was wrong with the request.
        detail: String,
    },

    /// The device serial number is not a hex string.
    #[error("invalid device serial number {serial:?}: expected hex octets")]
    InvalidSerial {
        /// Serial number as supplied.
        serial: String,
    },

    /// The ledger already contains the allocated serial.
    #[error("certificate serial {serial} already issued")]
    SerialCollision {
        /// Colliding serial.
        serial: String,
    },

    /// The signing capability failed.
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// Filesystem failure in the certificate store.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be parsed.
    #[error("corrupt store state: {detail}")]
    CorruptState {
        /// What failed to parse.
        detail: String,
    },

    /// Invalid authority configuration.
    #[error("configuration error: {detail}")]
    Config {
        /// What is wrong with the configuration.
        detail: String,
    },

    /// The requested issuance policy is not provided by this authority.
    #[error("certification-mode issuance is not supported by this authority")]
    Unsupported,
}
