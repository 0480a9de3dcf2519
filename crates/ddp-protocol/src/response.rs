//! Response decoding.
//!
//! The device does not echo the operation tag; decoding is keyed by the
//! operation the caller issued. A response is a 32-bit status, a 16-bit body
//! length and the body. For the generate operations a successful body starts
//! with a 32-bit length prefix followed by the generated material (key or
//! certificate request).

use crate::command::Operation;
use crate::error::CodecError;
use crate::RESPONSE_HEADER_LEN;

/// Device-reported status code. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    /// Operation completed.
    pub const SUCCESS: Self = Self(0);
    /// PSA already-exists status, reported when the requested key slot is
    /// occupied. Key-pair generation treats this as success-with-warning.
    pub const ALREADY_EXISTS: Self = Self(19);

    /// Whether this status reports success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded DDP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Device-reported status.
    pub status: Status,
    /// Raw body bytes, exactly as declared by the response header.
    pub body: Vec<u8>,
    /// Length-prefixed payload extracted from the body, for operations that
    /// produce one and only when the status is success.
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Decode a response frame for the given operation.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the frame is shorter than its header,
    /// when the declared body length disagrees with the bytes available, or
    /// when an expected payload prefix overruns the body.
    pub fn decode(operation: Operation, data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < RESPONSE_HEADER_LEN {
            return Err(CodecError::TooShort {
                len: data.len(),
                min: RESPONSE_HEADER_LEN,
            });
        }

        let status = Status(u32::from_le_bytes([data[0], data[1], data[2], data[3]]));
        let declared = u16::from_le_bytes([data[4], data[5]]) as usize;
        let actual = data.len() - RESPONSE_HEADER_LEN;
        if declared != actual {
            return Err(CodecError::LengthMismatch { declared, actual });
        }

        let body = data[RESPONSE_HEADER_LEN..].to_vec();
        let payload = if operation.has_payload() && status.is_success() {
            Some(Self::decode_payload(&body)?)
        } else {
            None
        };

        Ok(Self {
            status,
            body,
            payload,
        })
    }

    fn decode_payload(body: &[u8]) -> Result<Vec<u8>, CodecError> {
        if body.len() < 4 {
            return Err(CodecError::TooShort {
                len: body.len(),
                min: 4,
            });
        }
        let declared = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
        let available = body.len() - 4;
        if declared > available {
            return Err(CodecError::PayloadTruncated {
                declared,
                available,
            });
        }
        Ok(body[4..4 + declared].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(status: u32, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&status.to_le_bytes());
        data.extend_from_slice(&(body.len() as u16).to_le_bytes());
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn decodes_plain_response() {
        let data = frame(0, &[]);
        let resp = Response::decode(Operation::InitializeNvm, &data).expect("decode");
        assert_eq!(resp.status, Status::SUCCESS);
        assert!(resp.body.is_empty());
        assert!(resp.payload.is_none());
    }

    #[test]
    fn decodes_csr_payload() {
        let csr = b"fake request bytes";
        let mut body = (csr.len() as u32).to_le_bytes().to_vec();
        body.extend_from_slice(csr);
        let data = frame(0, &body);

        let resp = Response::decode(Operation::GenerateCsr, &data).expect("decode");
        assert_eq!(resp.payload.as_deref(), Some(csr.as_slice()));
    }

    #[test]
    fn failure_status_skips_payload() {
        let data = frame(19, &[]);
        let resp = Response::decode(Operation::GenerateKeyPair, &data).expect("decode");
        assert_eq!(resp.status, Status::ALREADY_EXISTS);
        assert!(resp.payload.is_none());
    }

    #[test]
    fn short_frame_is_rejected() {
        let err = Response::decode(Operation::WriteNvm, &[0, 0, 0]).expect_err("short");
        assert!(matches!(err, CodecError::TooShort { .. }));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut data = frame(0, &[1, 2, 3]);
        data.pop();
        let err = Response::decode(Operation::WriteNvm, &data).expect_err("mismatch");
        assert!(matches!(
            err,
            CodecError::LengthMismatch {
                declared: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut body = 32u32.to_le_bytes().to_vec();
        body.extend_from_slice(&[0u8; 8]);
        let data = frame(0, &body);
        let err = Response::decode(Operation::GenerateCsr, &data).expect_err("truncated");
        assert!(matches!(
            err,
            CodecError::PayloadTruncated {
                declared: 32,
                available: 8
            }
        ));
    }
}
