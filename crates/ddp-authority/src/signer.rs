//! Signer capability.
//!
//! Producing X.509 bytes is delegated to a narrow capability so that the
//! authority never assumes a concrete mechanism. The shipped implementation
//! ([`crate::OpensslSigner`]) shells out to the `openssl` tool; test code
//! substitutes an in-memory signer.

use thiserror::Error;
use zeroize::Zeroizing;

use crate::profile::SigningProfile;

/// Errors reported by a [`Signer`] implementation.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The signing tool reported a failure.
    #[error("signing tool failed: {detail}")]
    Tool {
        /// Tool diagnostics, verbatim.
        detail: String,
    },

    /// The request handed to the signer could not be processed.
    #[error("signer rejected the request: {detail}")]
    BadRequest {
        /// What was wrong with the request.
        detail: String,
    },

    /// Scratch-file or pipe failure while driving the tool.
    #[error("signer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key and certificate material for one CA tier.
///
/// The certificate is held in the canonical DER interchange encoding; the
/// private key stays in whatever encoding the signer produces (PEM for the
/// OpenSSL implementation) and is zeroized on drop.
pub struct CaMaterial {
    /// Certificate, DER encoded.
    pub certificate_der: Vec<u8>,
    /// Private key bytes.
    pub private_key: Zeroizing<Vec<u8>>,
}

impl CaMaterial {
    /// Construct from certificate and key bytes.
    #[must_use]
    pub fn new(certificate_der: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            certificate_der,
            private_key: Zeroizing::new(private_key),
        }
    }
}

impl std::fmt::Debug for CaMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaMaterial")
            .field("certificate_der_len", &self.certificate_der.len())
            .finish_non_exhaustive()
    }
}

/// Capability that turns signing profiles into certificate bytes.
pub trait Signer {
    /// Generate a key pair and a self-signed certificate (root tier).
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when generation fails.
    fn create_self_signed(&self, profile: &SigningProfile) -> Result<CaMaterial, SignerError>;

    /// Generate a key pair and a certificate signed by `issuer`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when generation or signing fails.
    fn create_signed(
        &self,
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<CaMaterial, SignerError>;

    /// Sign an externally produced DER request with `issuer`, returning the
    /// certificate in DER.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] when the request is unusable or signing
    /// fails.
    fn sign_request(
        &self,
        csr_der: &[u8],
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<Vec<u8>, SignerError>;
}
