//! Certificate request normalization.
//!
//! Devices hand back DER requests; operators may supply PEM files. The
//! authority accepts both and normalizes to DER before signing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AuthorityError, AuthorityResult};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE REQUEST-----";
const PEM_END: &str = "-----END CERTIFICATE REQUEST-----";

/// DER SEQUENCE tag; every DER-encoded request starts with it.
const DER_SEQUENCE: u8 = 0x30;

/// Normalize a certificate request in PEM or DER encoding to DER bytes.
///
/// # Errors
///
/// Returns [`AuthorityError::MalformedRequest`] when the input is neither a
/// DER SEQUENCE nor a PEM `CERTIFICATE REQUEST` block, or when the PEM body
/// does not decode.
pub fn normalize_request(csr: &[u8]) -> AuthorityResult<Vec<u8>> {
    match csr.first() {
        None => Err(AuthorityError::MalformedRequest {
            detail: "empty request".to_string(),
        }),
        Some(&DER_SEQUENCE) => Ok(csr.to_vec()),
        Some(_) => pem_to_der(csr),
    }
}

fn pem_to_der(csr: &[u8]) -> AuthorityResult<Vec<u8>> {
    let text = std::str::from_utf8(csr).map_err(|_| AuthorityError::MalformedRequest {
        detail: "request is neither DER nor PEM text".to_string(),
    })?;

    let begin = text
        .find(PEM_BEGIN)
        .ok_or_else(|| AuthorityError::MalformedRequest {
            detail: "missing CERTIFICATE REQUEST header".to_string(),
        })?;
    let end = text
        .find(PEM_END)
        .ok_or_else(|| AuthorityError::MalformedRequest {
            detail: "missing CERTIFICATE REQUEST trailer".to_string(),
        })?;
    if end <= begin {
        return Err(AuthorityError::MalformedRequest {
            detail: "request trailer precedes header".to_string(),
        });
    }

    let body: String = text[begin + PEM_BEGIN.len()..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let der = STANDARD
        .decode(body)
        .map_err(|e| AuthorityError::MalformedRequest {
            detail: format!("PEM body does not decode: {e}"),
        })?;
    if der.first() != Some(&DER_SEQUENCE) {
        return Err(AuthorityError::MalformedRequest {
            detail: "PEM body is not a DER SEQUENCE".to_string(),
        });
    }
    Ok(der)
}
