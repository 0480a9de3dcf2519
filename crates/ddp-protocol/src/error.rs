//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding or decoding DDP frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Frame shorter than its fixed header.
    #[error("frame too short (len {len}, min {min})")]
    TooShort {
        /// Bytes available.
        len: usize,
        /// Minimum bytes required.
        min: usize,
    },

    /// Declared body length disagrees with the bytes actually present.
    #[error("body length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch {
        /// Length declared in the header.
        declared: usize,
        /// Bytes actually available after the header.
        actual: usize,
    },

    /// A length-prefixed payload extends past the end of the body.
    #[error("payload truncated (declared {declared}, available {available})")]
    PayloadTruncated {
        /// Length declared in the payload prefix.
        declared: usize,
        /// Body bytes available after the prefix.
        available: usize,
    },

    /// Command body does not fit the 16-bit length field.
    #[error("body too large ({len} bytes, max {max})")]
    BodyTooLarge {
        /// Body length produced by encoding.
        len: usize,
        /// Maximum encodable body length.
        max: usize,
    },
}
