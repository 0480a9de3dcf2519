//! Deterministic in-memory signer.
//!
//! "Certificates" produced here are CBOR documents carrying the fields a
//! chain check needs (tier, subject, issuer, serial, hardware identity).
//! They let authority and orchestrator tests verify linkage and extension
//! content without a real signing tool.

use ddp_authority::{CaMaterial, Signer, SignerError, SigningProfile};
use serde::{Deserialize, Serialize};

/// Decoded test certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCertificate {
    /// Tier name (`root`, `batch`, `device`).
    pub tier: String,
    /// Subject DN string.
    pub subject: String,
    /// Issuer DN string. Equal to `subject` for self-signed certificates.
    pub issuer: String,
    /// Ledger-allocated certificate serial.
    pub serial: String,
    /// Hardware identity OID, device tier only.
    pub hw_type: Option<String>,
    /// Hardware identity serial, device tier only.
    pub hw_serial: Option<String>,
}

impl TestCertificate {
    /// Decode a test certificate from signer output.
    ///
    /// # Panics
    ///
    /// Panics when the bytes are not a test certificate; tests should only
    /// feed bytes produced by [`MemorySigner`].
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        ciborium::from_reader(bytes).expect("not a MemorySigner certificate")
    }

    /// Whether this certificate is self-signed.
    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    fn encode(&self) -> Result<Vec<u8>, SignerError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| SignerError::Tool {
            detail: format!("cbor encode: {e}"),
        })?;
        Ok(bytes)
    }
}

/// In-memory [`Signer`] with deterministic output.
#[derive(Debug, Default, Clone)]
pub struct MemorySigner;

impl MemorySigner {
    /// New memory signer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn certificate(
        profile: &SigningProfile,
        issuer_subject: Option<String>,
    ) -> Result<Vec<u8>, SignerError> {
        let subject = profile.subject.to_string();
        let issuer = issuer_subject.unwrap_or_else(|| subject.clone());
        let hardware = profile.extensions.hardware_module();
        TestCertificate {
            tier: profile.tier.to_string(),
            subject,
            issuer,
            serial: profile.serial.clone(),
            hw_type: hardware.map(|hw| hw.hw_type.clone()),
            hw_serial: hardware.map(|hw| hw.hw_serial.clone()),
        }
        .encode()
    }

    fn issuer_subject(issuer: &CaMaterial) -> String {
        TestCertificate::decode(&issuer.certificate_der).subject
    }
}

impl Signer for MemorySigner {
    fn create_self_signed(&self, profile: &SigningProfile) -> Result<CaMaterial, SignerError> {
        let cert = Self::certificate(profile, None)?;
        Ok(CaMaterial::new(
            cert,
            format!("test-key-{}", profile.tier).into_bytes(),
        ))
    }

    fn create_signed(
        &self,
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<CaMaterial, SignerError> {
        let cert = Self::certificate(profile, Some(Self::issuer_subject(issuer)))?;
        Ok(CaMaterial::new(
            cert,
            format!("test-key-{}", profile.tier).into_bytes(),
        ))
    }

    fn sign_request(
        &self,
        csr_der: &[u8],
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<Vec<u8>, SignerError> {
        if csr_der.first() != Some(&0x30) {
            return Err(SignerError::BadRequest {
                detail: "request is not DER".to_string(),
            });
        }
        Self::certificate(profile, Some(Self::issuer_subject(issuer)))
    }
}

/// A minimal DER-looking certificate request for tests.
#[must_use]
pub fn fake_csr_der() -> Vec<u8> {
    vec![0x30, 0x82, 0x00, 0x08, 0x02, 0x01, 0x00, 0x30, 0x00, 0xA0, 0x00, 0x00]
}
