//! End-to-end orchestrator runs against a scripted device.

use ddp_authority::{Authority, AuthorityConfig, DeviceOid};
use ddp_protocol::Operation;
use ddp_provision::{
    trusted_cert_slot, InjectionMaterial, ProvisionConfig, ProvisionError, ProvisionPhase,
    ProvisionWorkflow, SocProfile, NVM_KEY_BATCH_CERT, NVM_KEY_DEVICE_CERT, NVM_KEY_ROOT_CERT,
};
use ddp_testkit::{fake_csr_der, init_test_tracing, MemorySigner, ScriptedChannel, TestCertificate};
use tempfile::tempdir;
use zeroize::Zeroizing;

const DEVICE_SERIAL: &str = "0011223344556677";

fn test_authority(dir: &std::path::Path) -> Authority<MemorySigner> {
    let config = AuthorityConfig::builder()
        .store_dir(dir.join("pki"))
        .organization("Acme")
        .country("US")
        .build()
        .expect("config");
    let mut authority = Authority::new(config, MemorySigner::new());
    authority.setup(DeviceOid::new("1.2.3.4")).expect("setup");
    authority
}

fn test_config() -> ProvisionConfig {
    ProvisionConfig::builder()
        .soc(*SocProfile::find("xg25").expect("xg25"))
        .app_image(vec![0xFF; 64])
        .build()
        .expect("config")
}

fn frame_tag(frame: &[u8]) -> u16 {
    u16::from_le_bytes([frame[0], frame[1]])
}

fn nvm_object_key(frame: &[u8]) -> u32 {
    assert_eq!(frame_tag(frame), Operation::WriteNvm.tag());
    u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]])
}

#[test]
fn generation_run_writes_the_issued_chain() {
    init_test_tracing();
    let dir = tempdir().expect("tempdir");
    let mut authority = test_authority(dir.path());

    let mut channel = ScriptedChannel::new(DEVICE_SERIAL);
    channel.push_status(0); // initialize-nvm
    channel.push_payload(b"device-public-key"); // generate-key-pair
    channel.push_payload(&fake_csr_der()); // generate-csr
    channel.push_status(0); // write device cert
    channel.push_status(0); // write batch cert
    channel.push_status(0); // write root cert

    let mut workflow = ProvisionWorkflow::new(test_config(), channel);
    let report = workflow.run_generation(&mut authority).expect("run");
    assert_eq!(workflow.phase(), ProvisionPhase::TornDown);
    assert_eq!(report.device_serial, DEVICE_SERIAL);

    let device = TestCertificate::decode(&report.chain.device);
    assert_eq!(device.hw_serial.as_deref(), Some(DEVICE_SERIAL));

    let log = workflow.into_channel().log;
    assert_eq!(log.frames.len(), 6);
    assert_eq!(nvm_object_key(&log.frames[3]), NVM_KEY_DEVICE_CERT);
    assert_eq!(nvm_object_key(&log.frames[4]), NVM_KEY_BATCH_CERT);
    assert_eq!(nvm_object_key(&log.frames[5]), NVM_KEY_ROOT_CERT);

    // Entry halted the device; teardown released everything.
    assert_eq!(log.resets, vec![true, false]);
    assert!(log.link_stopped);
    assert!(log.closed);
    assert_eq!(log.images, vec![(0x2000_0000, 64)]);
}

#[test]
fn existing_key_pair_is_a_warning_not_a_failure() {
    let dir = tempdir().expect("tempdir");
    let mut authority = test_authority(dir.path());

    let mut channel = ScriptedChannel::new(DEVICE_SERIAL);
    channel.push_status(0); // initialize-nvm
    channel.push_status(19); // generate-key-pair: already exists
    channel.push_payload(&fake_csr_der()); // generate-csr
    channel.push_status(0);
    channel.push_status(0);
    channel.push_status(0);

    let mut workflow = ProvisionWorkflow::new(test_config(), channel);
    workflow
        .run_generation(&mut authority)
        .expect("status 19 must not abort the run");
}

#[test]
fn any_other_key_pair_status_aborts_the_run() {
    let dir = tempdir().expect("tempdir");
    let mut authority = test_authority(dir.path());

    let mut channel = ScriptedChannel::new(DEVICE_SERIAL);
    channel.push_status(0); // initialize-nvm
    channel.push_status(5); // generate-key-pair: some other failure

    let mut workflow = ProvisionWorkflow::new(test_config(), channel);
    let err = workflow
        .run_generation(&mut authority)
        .expect_err("status 5 must abort");
    match err {
        ProvisionError::Protocol { step, status } => {
            assert_eq!(step, Operation::GenerateKeyPair);
            assert_eq!(status.0, 5);
        }
        other => panic!("unexpected error: {other}"),
    }

    let log = workflow.into_channel().log;
    // Nothing past the failing step, and the session was torn down.
    assert_eq!(log.frames.len(), 2);
    assert!(log.link_stopped);
    assert!(log.closed);
    assert_eq!(log.resets, vec![true, false]);
}

#[test]
fn trusted_certificates_land_in_list_order() {
    let dir = tempdir().expect("tempdir");
    let _ = dir; // injection needs no authority

    let mut channel = ScriptedChannel::new(DEVICE_SERIAL);
    channel.push_status(0); // initialize-nvm
    channel.push_status(0); // inject key
    channel.push_status(0); // device cert
    channel.push_status(0); // trusted 0
    channel.push_status(0); // trusted 1
    channel.push_status(0); // trusted 2

    let material = InjectionMaterial {
        device_key: Some(Zeroizing::new(vec![0x42; 32])),
        device_cert: Some(vec![0xD0; 16]),
        trusted_certs: vec![vec![0xA0; 8], vec![0xA1; 8], vec![0xA2; 8]],
    };

    let mut workflow = ProvisionWorkflow::new(test_config(), channel);
    workflow.run_injection(&material).expect("run");

    let log = workflow.into_channel().log;
    assert_eq!(log.frames.len(), 6);
    assert_eq!(frame_tag(&log.frames[1]), Operation::InjectWisunKey.tag());
    assert_eq!(nvm_object_key(&log.frames[2]), NVM_KEY_DEVICE_CERT);
    assert_eq!(nvm_object_key(&log.frames[3]), trusted_cert_slot(0));
    assert_eq!(nvm_object_key(&log.frames[4]), trusted_cert_slot(1));
    assert_eq!(nvm_object_key(&log.frames[5]), trusted_cert_slot(2));
}

#[test]
fn failed_nvm_initialization_never_reaches_issuance() {
    let dir = tempdir().expect("tempdir");
    let mut authority = test_authority(dir.path());

    let mut channel = ScriptedChannel::new(DEVICE_SERIAL);
    channel.push_status(9); // initialize-nvm fails

    let mut workflow = ProvisionWorkflow::new(test_config(), channel);
    let err = workflow
        .run_generation(&mut authority)
        .expect_err("init failure must abort");
    assert!(matches!(
        err,
        ProvisionError::Protocol {
            step: Operation::InitializeNvm,
            ..
        }
    ));
    assert_eq!(workflow.phase(), ProvisionPhase::TornDown);

    let log = workflow.into_channel().log;
    assert_eq!(log.frames.len(), 1);
    // The channel is still stopped, the device reset and the connection
    // closed.
    assert!(log.link_stopped);
    assert!(log.closed);
    assert_eq!(log.resets, vec![true, false]);
}

#[test]
fn a_session_is_single_use() {
    let dir = tempdir().expect("tempdir");
    let mut authority = test_authority(dir.path());

    let mut channel = ScriptedChannel::new(DEVICE_SERIAL);
    channel.push_status(9);

    let mut workflow = ProvisionWorkflow::new(test_config(), channel);
    let _ = workflow.run_generation(&mut authority);
    let err = workflow
        .run_generation(&mut authority)
        .expect_err("second run must be refused");
    assert!(matches!(err, ProvisionError::Config { .. }));
}
