//! Golden byte vectors for the DDP wire format.
//!
//! These vectors pin the exact frame layout the provisioning application
//! expects. Any change here is a wire-format break.

use ddp_protocol::{Command, KeyAttributes, Operation, Response, Status};

#[test]
fn command_golden_vectors() {
    let attrs = KeyAttributes {
        lifetime: 0x0000_0001,
        location: 0x0000_0002,
        usage_flags: 0x0000_1400,
        bits: 256,
        algorithm: 0x0600_0609,
        key_type: 0x7112,
    };

    let cases: Vec<(Command, Vec<u8>)> = vec![
        (
            Command::InitializeNvm {
                base_addr: 0x081d_4000,
                size: 0xA000,
            },
            vec![
                0x07, 0x00, 0x08, 0x00, //
                0x00, 0x40, 0x1d, 0x08, //
                0x00, 0xA0, 0x00, 0x00,
            ],
        ),
        (
            Command::WriteNvm {
                key: 0x101,
                data: vec![0xDE, 0xAD],
            },
            vec![
                0x01, 0x00, 0x08, 0x00, //
                0x01, 0x01, 0x00, 0x00, //
                0x02, 0x00, 0xDE, 0xAD,
            ],
        ),
        (
            Command::GenerateKey {
                attrs,
                key_id: 0x100,
            },
            vec![
                0x03, 0x00, 0x1A, 0x00, //
                0x01, 0x00, 0x00, 0x00, // lifetime
                0x02, 0x00, 0x00, 0x00, // location
                0x00, 0x14, 0x00, 0x00, // usage flags
                0x00, 0x01, 0x00, 0x00, // bits
                0x09, 0x06, 0x00, 0x06, // algorithm
                0x12, 0x71, // type
                0x00, 0x01, 0x00, 0x00, // key id
            ],
        ),
        (
            Command::GenerateKeyPair { key_id: 0x100 },
            vec![0xC9, 0x00, 0x04, 0x00, 0x00, 0x01, 0x00, 0x00],
        ),
        (
            Command::GenerateCsr { key_id: 0x100 },
            vec![0xC8, 0x00, 0x04, 0x00, 0x00, 0x01, 0x00, 0x00],
        ),
        (
            Command::InjectWisunKey {
                key_id: 0x100,
                key: vec![0x11, 0x22, 0x33, 0x44],
            },
            vec![
                0xCA, 0x00, 0x0C, 0x00, //
                0x00, 0x01, 0x00, 0x00, // key id
                0x04, 0x00, 0x00, 0x00, // key length
                0x11, 0x22, 0x33, 0x44,
            ],
        ),
    ];

    for (cmd, expected) in cases {
        let frame = cmd.encode().expect("encode");
        assert_eq!(frame, expected, "frame mismatch for {}", cmd.operation());
    }
}

#[test]
fn response_golden_vector_with_payload() {
    // status 0, body = u32 length prefix + 3 payload bytes
    let data = vec![
        0x00, 0x00, 0x00, 0x00, // status
        0x07, 0x00, // body length
        0x03, 0x00, 0x00, 0x00, // payload length
        0xAB, 0xCD, 0xEF,
    ];
    let resp = Response::decode(Operation::GenerateKeyPair, &data).expect("decode");
    assert_eq!(resp.status, Status::SUCCESS);
    assert_eq!(resp.payload, Some(vec![0xAB, 0xCD, 0xEF]));
}

#[test]
fn response_golden_vector_error_status() {
    let data = vec![0x13, 0x00, 0x00, 0x00, 0x00, 0x00];
    let resp = Response::decode(Operation::GenerateKeyPair, &data).expect("decode");
    assert_eq!(resp.status, Status::ALREADY_EXISTS);
    assert!(!resp.status.is_success());
    assert!(resp.payload.is_none());
}
