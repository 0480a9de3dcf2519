//! The authority: setup and issuance.

use std::fs;

use crate::config::{AuthorityConfig, AuthorityConfigBuilder, DEFAULT_VALIDITY_DAYS};
use crate::csr::normalize_request;
use crate::error::{AuthorityError, AuthorityResult};
use crate::ledger::SerialLedger;
use crate::profile::{
    CertificateTier, ExtensionProfile, HardwareModuleName, SigningProfile, SubjectName,
};
use crate::signer::{CaMaterial, Signer};
use crate::store::{load_identity, save_identity, DeviceOid, StoreIdentity, StoreLayout};

/// A complete issued chain, every certificate in DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    /// Device leaf certificate.
    pub device: Vec<u8>,
    /// Batch intermediate certificate.
    pub batch: Vec<u8>,
    /// Root certificate.
    pub root: Vec<u8>,
}

#[derive(Debug)]
struct AuthorityState {
    oid: DeviceOid,
    ledger: SerialLedger,
    root: CaMaterial,
    batch: CaMaterial,
}

/// Local certificate authority over a persisted store directory.
///
/// Owns the root/batch signing material and the serial ledger for its
/// process lifetime.
#[derive(Debug)]
pub struct Authority<S> {
    config: AuthorityConfig,
    layout: StoreLayout,
    signer: S,
    state: Option<AuthorityState>,
}

impl<S: Signer> Authority<S> {
    /// Create an authority over `config` without touching the store.
    ///
    /// Call [`Authority::setup`] to build a fresh store, or
    /// [`Authority::open`] to load an existing one.
    #[must_use]
    pub fn new(config: AuthorityConfig, signer: S) -> Self {
        let layout = StoreLayout::new(&config.store_dir);
        Self {
            config,
            layout,
            signer,
            state: None,
        }
    }

    /// Open an authority over an existing store, restoring the identity
    /// (OID, organization, country, batch number) persisted at setup time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::NotInitialized`] when the store directory
    /// or any of its artifacts is missing, [`AuthorityError::MissingOid`]
    /// when no identity was persisted, and propagates load failures.
    pub fn open(store_dir: impl Into<std::path::PathBuf>, signer: S) -> AuthorityResult<Self> {
        let layout = StoreLayout::new(store_dir);
        Self::check_artifacts(&layout)?;
        let identity = load_identity(&layout)?.ok_or(AuthorityError::MissingOid)?;

        let config = AuthorityConfigBuilder::default()
            .store_dir(layout.dir())
            .organization(identity.organization.clone())
            .country(identity.country.clone())
            .batch_number(identity.batch_number.clone())
            .validity_days(DEFAULT_VALIDITY_DAYS)
            .build()?;
        let mut authority = Self::new(config, signer);
        authority.load(identity.oid)?;
        Ok(authority)
    }

    /// Whether signing material is loaded.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// The device OID persisted at setup time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::NotInitialized`] before setup/open.
    pub fn device_oid(&self) -> AuthorityResult<&DeviceOid> {
        self.state
            .as_ref()
            .map(|state| &state.oid)
            .ok_or_else(|| self.not_initialized())
    }

    /// Reset the store and generate fresh Root and Batch material.
    ///
    /// On any failure the store directory is removed entirely: the
    /// authority is never left partially initialized.
    ///
    /// # Errors
    ///
    /// Propagates signer and filesystem failures. These are fatal for the
    /// authority instance; a subsequent call starts from scratch.
    pub fn setup(&mut self, oid: DeviceOid) -> AuthorityResult<()> {
        self.state = None;
        match self.try_setup(oid) {
            Ok(state) => {
                self.state = Some(state);
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_dir_all(self.layout.dir());
                Err(err)
            }
        }
    }

    /// Issue a device certificate for a request produced on the device.
    ///
    /// The request may be DER or PEM. `device_serial` is the device's own
    /// serial number (hex octets) and is embedded, together with `oid`, as
    /// the hardware-module alternative name; the certificate's serial is a
    /// fresh ledger allocation, distinct from the device serial.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::NotInitialized`] before setup/open,
    /// [`AuthorityError::InvalidSerial`]/[`AuthorityError::MalformedRequest`]
    /// for unusable inputs, [`AuthorityError::SerialCollision`] if the
    /// ledger detects a duplicate, and signer failures verbatim.
    pub fn issue_device_certificate(
        &mut self,
        oid: &DeviceOid,
        device_serial: &str,
        csr: &[u8],
    ) -> AuthorityResult<CertificateChain> {
        let Some(state) = self.state.as_mut() else {
            return Err(AuthorityError::NotInitialized {
                path: self.layout.dir().to_path_buf(),
            });
        };
        if device_serial.is_empty() || !device_serial.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AuthorityError::InvalidSerial {
                serial: device_serial.to_string(),
            });
        }
        let csr_der = normalize_request(csr)?;
        let hw_serial = device_serial.to_lowercase();

        tracing::debug!(oid = %oid, serial = %hw_serial, "issuing device certificate");
        let cert_serial = state
            .ledger
            .allocate(CertificateTier::Device, hw_serial.clone())?;
        let profile = SigningProfile {
            tier: CertificateTier::Device,
            subject: SubjectName::device(&self.config.organization, &self.config.country),
            serial: cert_serial,
            extensions: ExtensionProfile::device(HardwareModuleName {
                hw_type: oid.to_string(),
                hw_serial: hw_serial.clone(),
            }),
            validity_days: self.config.validity_days,
        };

        let device = self.signer.sign_request(&csr_der, &profile, &state.batch)?;
        fs::write(self.layout.device_cert(&hw_serial), &device)?;
        tracing::info!(serial = %hw_serial, "device certificate issued");

        Ok(CertificateChain {
            device,
            batch: state.batch.certificate_der.clone(),
            root: state.root.certificate_der.clone(),
        })
    }

    /// Issue a device certificate under the third-party certification
    /// policy.
    ///
    /// Extension point for certification-test campaigns; this authority
    /// does not provide the policy.
    ///
    /// # Errors
    ///
    /// Always returns [`AuthorityError::Unsupported`].
    pub fn issue_certification_certificate(
        &mut self,
        _oid: &DeviceOid,
        _device_serial: &str,
        _csr: &[u8],
    ) -> AuthorityResult<CertificateChain> {
        Err(AuthorityError::Unsupported)
    }

    fn not_initialized(&self) -> AuthorityError {
        AuthorityError::NotInitialized {
            path: self.layout.dir().to_path_buf(),
        }
    }

    fn try_setup(&self, oid: DeviceOid) -> AuthorityResult<AuthorityState> {
        let dir = self.layout.dir();
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::create_dir_all(dir)?;

        tracing::info!(
            organization = %self.config.organization,
            country = %self.config.country,
            oid = %oid,
            "setting up local PKI"
        );
        save_identity(
            &self.layout,
            &StoreIdentity {
                oid: oid.clone(),
                organization: self.config.organization.clone(),
                country: self.config.country.clone(),
                batch_number: self.config.batch_number.clone(),
            },
        )?;
        let mut ledger = SerialLedger::create(self.layout.ledger_file())?;

        tracing::debug!("generating root certificate");
        let root_serial = ledger.allocate(CertificateTier::Root, "root")?;
        let root_profile = SigningProfile {
            tier: CertificateTier::Root,
            subject: SubjectName::root(&self.config.organization, &self.config.country),
            serial: root_serial,
            extensions: ExtensionProfile::root(),
            validity_days: self.config.validity_days,
        };
        let root = self.signer.create_self_signed(&root_profile)?;
        fs::write(self.layout.root_cert(), &root.certificate_der)?;
        fs::write(self.layout.root_key(), root.private_key.as_slice())?;

        tracing::debug!(batch = %self.config.batch_number, "generating batch certificate");
        let batch_serial =
            ledger.allocate(CertificateTier::Batch, self.config.batch_number.clone())?;
        let batch_profile = SigningProfile {
            tier: CertificateTier::Batch,
            subject: SubjectName::batch(
                &self.config.organization,
                &self.config.country,
                &self.config.batch_number,
            ),
            serial: batch_serial,
            extensions: ExtensionProfile::batch(),
            validity_days: self.config.validity_days,
        };
        let batch = self.signer.create_signed(&batch_profile, &root)?;
        fs::write(self.layout.batch_cert(), &batch.certificate_der)?;
        fs::write(self.layout.batch_key(), batch.private_key.as_slice())?;

        Ok(AuthorityState {
            oid,
            ledger,
            root,
            batch,
        })
    }

    fn check_artifacts(layout: &StoreLayout) -> AuthorityResult<()> {
        let have_artifacts = layout.dir().is_dir()
            && layout.ledger_file().is_file()
            && layout.root_cert().is_file()
            && layout.root_key().is_file()
            && layout.batch_cert().is_file()
            && layout.batch_key().is_file();
        if have_artifacts {
            Ok(())
        } else {
            Err(AuthorityError::NotInitialized {
                path: layout.dir().to_path_buf(),
            })
        }
    }

    fn load(&mut self, oid: DeviceOid) -> AuthorityResult<()> {
        let ledger = SerialLedger::open(self.layout.ledger_file())?;
        let root = CaMaterial::new(
            fs::read(self.layout.root_cert())?,
            fs::read(self.layout.root_key())?,
        );
        let batch = CaMaterial::new(
            fs::read(self.layout.batch_cert())?,
            fs::read(self.layout.batch_key())?,
        );

        self.state = Some(AuthorityState {
            oid,
            ledger,
            root,
            batch,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::SignerError;
    use tempfile::tempdir;

    /// Fake signer: certificates are JSON describing what was signed.
    #[derive(Debug)]
    struct FakeSigner {
        fail_on: Option<CertificateTier>,
    }

    impl FakeSigner {
        const fn reliable() -> Self {
            Self { fail_on: None }
        }

        fn fabricate(profile: &SigningProfile, issuer: Option<&str>) -> Vec<u8> {
            format!(
                "{{\"tier\":\"{}\",\"subject\":\"{}\",\"issuer\":\"{}\",\"serial\":\"{}\"}}",
                profile.tier,
                profile.subject,
                issuer.unwrap_or(&profile.subject.to_string()),
                profile.serial
            )
            .into_bytes()
        }

        fn check(&self, tier: CertificateTier) -> Result<(), SignerError> {
            if self.fail_on == Some(tier) {
                return Err(SignerError::Tool {
                    detail: format!("injected failure at {tier}"),
                });
            }
            Ok(())
        }
    }

    impl Signer for FakeSigner {
        fn create_self_signed(&self, profile: &SigningProfile) -> Result<CaMaterial, SignerError> {
            self.check(profile.tier)?;
            Ok(CaMaterial::new(
                Self::fabricate(profile, None),
                b"key".to_vec(),
            ))
        }

        fn create_signed(
            &self,
            profile: &SigningProfile,
            _issuer: &CaMaterial,
        ) -> Result<CaMaterial, SignerError> {
            self.check(profile.tier)?;
            Ok(CaMaterial::new(
                Self::fabricate(profile, Some("root")),
                b"key".to_vec(),
            ))
        }

        fn sign_request(
            &self,
            _csr_der: &[u8],
            profile: &SigningProfile,
            _issuer: &CaMaterial,
        ) -> Result<Vec<u8>, SignerError> {
            self.check(profile.tier)?;
            Ok(Self::fabricate(profile, Some("batch")))
        }
    }

    fn test_config(dir: &std::path::Path) -> AuthorityConfig {
        AuthorityConfig::builder()
            .store_dir(dir.join("pki"))
            .organization("Acme")
            .country("US")
            .build()
            .expect("config")
    }

    #[test]
    fn setup_builds_a_complete_store() {
        let dir = tempdir().expect("tempdir");
        let mut authority = Authority::new(test_config(dir.path()), FakeSigner::reliable());
        authority.setup(DeviceOid::new("1.2.3.4")).expect("setup");

        let layout = StoreLayout::new(dir.path().join("pki"));
        assert!(layout.root_cert().is_file());
        assert!(layout.root_key().is_file());
        assert!(layout.batch_cert().is_file());
        assert!(layout.batch_key().is_file());
        assert!(layout.ledger_file().is_file());
        assert!(layout.config_file().is_file());
        assert_eq!(authority.device_oid().expect("oid").as_str(), "1.2.3.4");
    }

    #[test]
    fn failed_setup_leaves_no_store_behind() {
        let dir = tempdir().expect("tempdir");
        let signer = FakeSigner {
            fail_on: Some(CertificateTier::Batch),
        };
        let mut authority = Authority::new(test_config(dir.path()), signer);
        let err = authority
            .setup(DeviceOid::new("1.2.3.4"))
            .expect_err("setup should fail");
        assert!(matches!(err, AuthorityError::Signer(_)));
        assert!(!dir.path().join("pki").exists());
        assert!(!authority.is_initialized());
    }

    #[test]
    fn issue_requires_initialization() {
        let dir = tempdir().expect("tempdir");
        let mut authority = Authority::new(test_config(dir.path()), FakeSigner::reliable());
        let err = authority
            .issue_device_certificate(&DeviceOid::new("1.2.3.4"), "0011223344556677", &[0x30])
            .expect_err("uninitialized");
        assert!(matches!(err, AuthorityError::NotInitialized { .. }));
    }

    #[test]
    fn issue_rejects_non_hex_serial() {
        let dir = tempdir().expect("tempdir");
        let mut authority = Authority::new(test_config(dir.path()), FakeSigner::reliable());
        authority.setup(DeviceOid::new("1.2.3.4")).expect("setup");
        let err = authority
            .issue_device_certificate(&DeviceOid::new("1.2.3.4"), "not-hex!", &[0x30])
            .expect_err("bad serial");
        assert!(matches!(err, AuthorityError::InvalidSerial { .. }));
    }

    #[test]
    fn issued_serials_differ_across_issuances() {
        let dir = tempdir().expect("tempdir");
        let mut authority = Authority::new(test_config(dir.path()), FakeSigner::reliable());
        authority.setup(DeviceOid::new("1.2.3.4")).expect("setup");
        let oid = DeviceOid::new("1.2.3.4");

        let first = authority
            .issue_device_certificate(&oid, "0011223344556677", &[0x30])
            .expect("issue");
        let second = authority
            .issue_device_certificate(&oid, "8899aabbccddeeff", &[0x30])
            .expect("issue");
        assert_ne!(first.device, second.device);
    }

    #[test]
    fn reopen_restores_material_and_ledger() {
        let dir = tempdir().expect("tempdir");
        {
            let mut authority = Authority::new(test_config(dir.path()), FakeSigner::reliable());
            authority.setup(DeviceOid::new("1.2.3.4")).expect("setup");
        }

        let mut reopened =
            Authority::open(dir.path().join("pki"), FakeSigner::reliable()).expect("open");
        assert!(reopened.is_initialized());
        assert_eq!(reopened.device_oid().expect("oid").as_str(), "1.2.3.4");
        let chain = reopened
            .issue_device_certificate(&DeviceOid::new("1.2.3.4"), "0011223344556677", &[0x30])
            .expect("issue");
        assert!(!chain.device.is_empty());
        assert!(!chain.batch.is_empty());
        assert!(!chain.root.is_empty());
    }

    #[test]
    fn open_refuses_a_missing_store() {
        let dir = tempdir().expect("tempdir");
        let err = Authority::open(dir.path().join("pki"), FakeSigner::reliable())
            .expect_err("no store");
        assert!(matches!(err, AuthorityError::NotInitialized { .. }));
    }

    #[test]
    fn certification_mode_is_an_unimplemented_extension_point() {
        let dir = tempdir().expect("tempdir");
        let mut authority = Authority::new(test_config(dir.path()), FakeSigner::reliable());
        authority.setup(DeviceOid::new("1.2.3.4")).expect("setup");
        let err = authority
            .issue_certification_certificate(&DeviceOid::new("1.2.3.4"), "00", &[0x30])
            .expect_err("unsupported");
        assert!(matches!(err, AuthorityError::Unsupported));
    }
}
