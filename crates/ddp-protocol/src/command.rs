//! Typed DDP commands and frame encoding.
//!
//! Command tags and body layouts are fixed by the provisioning application's
//! wire contract. All integers are little-endian; every length field
//! immediately precedes the bytes it counts.

use crate::error::CodecError;
use crate::FRAME_HEADER_LEN;

/// Operation tags understood by the provisioning application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Operation {
    /// Write one object into the device's NVM store.
    WriteNvm = 1,
    /// Inject a PSA Crypto key with explicit attributes.
    InjectKey = 2,
    /// Generate a PSA Crypto key on the device.
    GenerateKey = 3,
    /// Initialize the NVM instance backing the object store.
    InitializeNvm = 7,
    /// Generate a Wi-SUN certificate request on the device.
    GenerateCsr = 200,
    /// Generate the Wi-SUN device key pair on the device.
    GenerateKeyPair = 201,
    /// Inject a pre-existing Wi-SUN device private key.
    InjectWisunKey = 202,
}

impl Operation {
    /// Wire tag for this operation.
    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// Whether a successful response to this operation carries a
    /// length-prefixed payload in its body.
    #[must_use]
    pub const fn has_payload(self) -> bool {
        matches!(
            self,
            Self::GenerateKey | Self::GenerateCsr | Self::GenerateKeyPair
        )
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WriteNvm => "write-nvm",
            Self::InjectKey => "inject-key",
            Self::GenerateKey => "generate-key",
            Self::InitializeNvm => "initialize-nvm",
            Self::GenerateCsr => "generate-csr",
            Self::GenerateKeyPair => "generate-key-pair",
            Self::InjectWisunKey => "inject-wisun-key",
        };
        write!(f, "{name}")
    }
}

/// PSA key attributes carried by the key injection/generation commands.
///
/// The numeric values are PSA Crypto constants (`psa_key_lifetime_t` and
/// friends); this crate treats them as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyAttributes {
    /// Key lifetime.
    pub lifetime: u32,
    /// Key storage location.
    pub location: u32,
    /// Permitted usage flags.
    pub usage_flags: u32,
    /// Key length in bits.
    pub bits: u32,
    /// Permitted algorithm.
    pub algorithm: u32,
    /// Key type.
    pub key_type: u16,
}

impl KeyAttributes {
    /// Encoded attribute block length in bytes.
    pub const ENCODED_LEN: usize = 22;

    fn encode_into(self, body: &mut Vec<u8>) {
        body.extend_from_slice(&self.lifetime.to_le_bytes());
        body.extend_from_slice(&self.location.to_le_bytes());
        body.extend_from_slice(&self.usage_flags.to_le_bytes());
        body.extend_from_slice(&self.bits.to_le_bytes());
        body.extend_from_slice(&self.algorithm.to_le_bytes());
        body.extend_from_slice(&self.key_type.to_le_bytes());
    }
}

/// A DDP command, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Initialize the NVM instance at `base_addr` spanning `size` bytes.
    InitializeNvm {
        /// Flash address of the NVM instance.
        base_addr: u32,
        /// NVM instance size in bytes.
        size: u32,
    },
    /// Write `data` into the NVM object identified by `key`.
    WriteNvm {
        /// Well-known NVM object key.
        key: u32,
        /// Object payload.
        data: Vec<u8>,
    },
    /// Inject a PSA key with explicit attributes.
    InjectKey {
        /// PSA attributes of the injected key.
        attrs: KeyAttributes,
        /// PSA key identifier.
        key_id: u32,
        /// Raw key material.
        key: Vec<u8>,
    },
    /// Generate a PSA key on the device.
    GenerateKey {
        /// PSA attributes of the generated key.
        attrs: KeyAttributes,
        /// PSA key identifier.
        key_id: u32,
    },
    /// Generate a Wi-SUN certificate request against `key_id`.
    GenerateCsr {
        /// PSA key identifier holding the device key pair.
        key_id: u32,
    },
    /// Generate the Wi-SUN device key pair under `key_id`.
    GenerateKeyPair {
        /// PSA key identifier to create.
        key_id: u32,
    },
    /// Inject a pre-existing Wi-SUN device private key under `key_id`.
    InjectWisunKey {
        /// PSA key identifier to create.
        key_id: u32,
        /// Raw private key scalar.
        key: Vec<u8>,
    },
}

impl Command {
    /// Operation tag of this command.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::InitializeNvm { .. } => Operation::InitializeNvm,
            Self::WriteNvm { .. } => Operation::WriteNvm,
            Self::InjectKey { .. } => Operation::InjectKey,
            Self::GenerateKey { .. } => Operation::GenerateKey,
            Self::GenerateCsr { .. } => Operation::GenerateCsr,
            Self::GenerateKeyPair { .. } => Operation::GenerateKeyPair,
            Self::InjectWisunKey { .. } => Operation::InjectWisunKey,
        }
    }

    /// Encode the command into a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BodyTooLarge`] if the body exceeds the 16-bit
    /// length field.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let body = self.encode_body();
        let len = u16::try_from(body.len()).map_err(|_| CodecError::BodyTooLarge {
            len: body.len(),
            max: u16::MAX as usize,
        })?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
        frame.extend_from_slice(&self.operation().tag().to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        match self {
            Self::InitializeNvm { base_addr, size } => {
                body.extend_from_slice(&base_addr.to_le_bytes());
                body.extend_from_slice(&size.to_le_bytes());
            }
            Self::WriteNvm { key, data } => {
                body.extend_from_slice(&key.to_le_bytes());
                // Object length is clamped by the frame-level check; a u16
                // overflow here would also overflow the frame body.
                body.extend_from_slice(&(data.len() as u16).to_le_bytes());
                body.extend_from_slice(data);
            }
            Self::InjectKey { attrs, key_id, key } => {
                attrs.encode_into(&mut body);
                body.extend_from_slice(&key_id.to_le_bytes());
                body.extend_from_slice(&(key.len() as u32).to_le_bytes());
                body.extend_from_slice(key);
            }
            Self::GenerateKey { attrs, key_id } => {
                attrs.encode_into(&mut body);
                body.extend_from_slice(&key_id.to_le_bytes());
            }
            Self::GenerateCsr { key_id } | Self::GenerateKeyPair { key_id } => {
                body.extend_from_slice(&key_id.to_le_bytes());
            }
            Self::InjectWisunKey { key_id, key } => {
                body.extend_from_slice(&key_id.to_le_bytes());
                body.extend_from_slice(&(key.len() as u32).to_le_bytes());
                body.extend_from_slice(key);
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_nvm_frame_layout() {
        let cmd = Command::InitializeNvm {
            base_addr: 0x000f_7000,
            size: 0x9000,
        };
        let frame = cmd.encode().expect("encode");
        assert_eq!(
            frame,
            vec![
                0x07, 0x00, // tag 7
                0x08, 0x00, // body length 8
                0x00, 0x70, 0x0f, 0x00, // base address
                0x00, 0x90, 0x00, 0x00, // size
            ]
        );
    }

    #[test]
    fn write_nvm_frame_layout() {
        let cmd = Command::WriteNvm {
            key: 0x100,
            data: vec![0xAA, 0xBB, 0xCC],
        };
        let frame = cmd.encode().expect("encode");
        assert_eq!(
            frame,
            vec![
                0x01, 0x00, // tag 1
                0x09, 0x00, // body length 9
                0x00, 0x01, 0x00, 0x00, // object key
                0x03, 0x00, // object length
                0xAA, 0xBB, 0xCC,
            ]
        );
    }

    #[test]
    fn generate_csr_frame_layout() {
        let cmd = Command::GenerateCsr { key_id: 0x100 };
        let frame = cmd.encode().expect("encode");
        assert_eq!(frame, vec![0xC8, 0x00, 0x04, 0x00, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn inject_key_body_length() {
        let cmd = Command::InjectKey {
            attrs: KeyAttributes {
                lifetime: 1,
                location: 2,
                usage_flags: 3,
                bits: 256,
                algorithm: 4,
                key_type: 5,
            },
            key_id: 0x100,
            key: vec![0x42; 32],
        };
        let frame = cmd.encode().expect("encode");
        let declared = u16::from_le_bytes([frame[2], frame[3]]) as usize;
        assert_eq!(declared, KeyAttributes::ENCODED_LEN + 4 + 4 + 32);
        assert_eq!(frame.len(), FRAME_HEADER_LEN + declared);
    }

    #[test]
    fn oversized_body_is_rejected() {
        let cmd = Command::WriteNvm {
            key: 0x100,
            data: vec![0; u16::MAX as usize + 1],
        };
        assert!(matches!(
            cmd.encode(),
            Err(CodecError::BodyTooLarge { .. })
        ));
    }
}
