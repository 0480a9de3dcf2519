//! `openssl`-backed [`Signer`] implementation.
//!
//! Drives the `openssl` command-line tool through scratch files in a
//! per-operation temporary directory. Keys are P-256 (`prime256v1`).
//! Nothing outside this module knows the tool exists.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use zeroize::Zeroizing;

use crate::profile::{CertificateTier, SigningProfile};
use crate::signer::{CaMaterial, Signer, SignerError};

const EC_CURVE: &str = "prime256v1";

/// Signer that shells out to the `openssl` binary.
#[derive(Debug, Clone)]
pub struct OpensslSigner {
    binary: PathBuf,
}

impl Default for OpensslSigner {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("openssl"),
        }
    }
}

impl OpensslSigner {
    /// Use the `openssl` binary found on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit `openssl` binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether the configured binary responds at all.
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn run<I, S>(&self, args: I) -> Result<Vec<u8>, SignerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.binary).args(args).output()?;
        if !output.status.success() {
            return Err(SignerError::Tool {
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn generate_key(&self, path: &Path) -> Result<(), SignerError> {
        self.run([
            OsStr::new("ecparam"),
            OsStr::new("-name"),
            OsStr::new(EC_CURVE),
            OsStr::new("-genkey"),
            OsStr::new("-noout"),
            OsStr::new("-out"),
            path.as_os_str(),
        ])?;
        Ok(())
    }

    fn cert_to_der(&self, pem: &Path, der: &Path) -> Result<(), SignerError> {
        self.run([
            OsStr::new("x509"),
            OsStr::new("-in"),
            pem.as_os_str(),
            OsStr::new("-outform"),
            OsStr::new("DER"),
            OsStr::new("-out"),
            der.as_os_str(),
        ])?;
        Ok(())
    }

    fn write_config(dir: &Path, profile: &SigningProfile) -> Result<PathBuf, SignerError> {
        let path = dir.join("signing.cnf");
        fs::write(&path, render_config(profile))?;
        Ok(path)
    }

    fn sign_csr_pem(
        &self,
        dir: &Path,
        csr_pem: &Path,
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<Vec<u8>, SignerError> {
        let issuer_der = dir.join("issuer.der");
        let issuer_pem = dir.join("issuer.pem");
        let issuer_key = dir.join("issuer_key.pem");
        fs::write(&issuer_der, &issuer.certificate_der)?;
        fs::write(&issuer_key, issuer.private_key.as_slice())?;
        self.run([
            OsStr::new("x509"),
            OsStr::new("-inform"),
            OsStr::new("DER"),
            OsStr::new("-in"),
            issuer_der.as_os_str(),
            OsStr::new("-out"),
            issuer_pem.as_os_str(),
        ])?;

        let config = Self::write_config(dir, profile)?;
        let cert_pem = dir.join("cert.pem");
        let cert_der = dir.join("cert.der");
        let serial = format!("0x{}", profile.serial);
        let days = profile.validity_days.to_string();
        self.run([
            OsStr::new("x509"),
            OsStr::new("-req"),
            OsStr::new("-in"),
            csr_pem.as_os_str(),
            OsStr::new("-CA"),
            issuer_pem.as_os_str(),
            OsStr::new("-CAkey"),
            issuer_key.as_os_str(),
            OsStr::new("-set_serial"),
            OsStr::new(&serial),
            OsStr::new("-days"),
            OsStr::new(&days),
            OsStr::new("-sha256"),
            OsStr::new("-extfile"),
            config.as_os_str(),
            OsStr::new("-extensions"),
            OsStr::new(profile.extensions.section_name()),
            OsStr::new("-out"),
            cert_pem.as_os_str(),
        ])?;
        self.cert_to_der(&cert_pem, &cert_der)?;
        Ok(fs::read(cert_der)?)
    }
}

impl Signer for OpensslSigner {
    fn create_self_signed(&self, profile: &SigningProfile) -> Result<CaMaterial, SignerError> {
        let dir = tempfile::tempdir()?;
        let key = dir.path().join("key.pem");
        let cert_pem = dir.path().join("cert.pem");
        let cert_der = dir.path().join("cert.der");
        self.generate_key(&key)?;

        let config = Self::write_config(dir.path(), profile)?;
        let subject = profile.subject.to_string();
        let serial = format!("0x{}", profile.serial);
        let days = profile.validity_days.to_string();
        self.run([
            OsStr::new("req"),
            OsStr::new("-new"),
            OsStr::new("-x509"),
            OsStr::new("-key"),
            key.as_os_str(),
            OsStr::new("-subj"),
            OsStr::new(&subject),
            OsStr::new("-set_serial"),
            OsStr::new(&serial),
            OsStr::new("-days"),
            OsStr::new(&days),
            OsStr::new("-sha256"),
            OsStr::new("-config"),
            config.as_os_str(),
            OsStr::new("-extensions"),
            OsStr::new(profile.extensions.section_name()),
            OsStr::new("-out"),
            cert_pem.as_os_str(),
        ])?;
        self.cert_to_der(&cert_pem, &cert_der)?;

        Ok(CaMaterial {
            certificate_der: fs::read(cert_der)?,
            private_key: Zeroizing::new(fs::read(key)?),
        })
    }

    fn create_signed(
        &self,
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<CaMaterial, SignerError> {
        let dir = tempfile::tempdir()?;
        let key = dir.path().join("key.pem");
        let csr_pem = dir.path().join("req.pem");
        self.generate_key(&key)?;

        let config = Self::write_config(dir.path(), profile)?;
        let subject = profile.subject.to_string();
        self.run([
            OsStr::new("req"),
            OsStr::new("-new"),
            OsStr::new("-key"),
            key.as_os_str(),
            OsStr::new("-subj"),
            OsStr::new(&subject),
            OsStr::new("-sha256"),
            OsStr::new("-config"),
            config.as_os_str(),
            OsStr::new("-out"),
            csr_pem.as_os_str(),
        ])?;

        let certificate_der = self.sign_csr_pem(dir.path(), &csr_pem, profile, issuer)?;
        Ok(CaMaterial {
            certificate_der,
            private_key: Zeroizing::new(fs::read(key)?),
        })
    }

    fn sign_request(
        &self,
        csr_der: &[u8],
        profile: &SigningProfile,
        issuer: &CaMaterial,
    ) -> Result<Vec<u8>, SignerError> {
        let dir = tempfile::tempdir()?;
        let csr_in = dir.path().join("req.der");
        let csr_pem = dir.path().join("req.pem");
        fs::write(&csr_in, csr_der)?;
        // Round-tripping through `req` both validates and re-encodes.
        self.run([
            OsStr::new("req"),
            OsStr::new("-inform"),
            OsStr::new("DER"),
            OsStr::new("-in"),
            csr_in.as_os_str(),
            OsStr::new("-out"),
            csr_pem.as_os_str(),
        ])
        .map_err(|e| match e {
            SignerError::Tool { detail } => SignerError::BadRequest { detail },
            other => other,
        })?;

        self.sign_csr_pem(dir.path(), &csr_pem, profile, issuer)
    }
}

fn render_config(profile: &SigningProfile) -> String {
    let mut config = String::from("[ req ]\nprompt = no\ndistinguished_name = req_dn\n\n[ req_dn ]\n\n");
    match profile.tier {
        CertificateTier::Root => {
            config.push_str(
                "[ v3_root ]\n\
                 basicConstraints = critical,CA:true\n\
                 keyUsage = critical,keyCertSign,cRLSign\n\
                 subjectKeyIdentifier = hash\n",
            );
        }
        CertificateTier::Batch => {
            config.push_str(
                "[ v3_batch ]\n\
                 basicConstraints = critical,CA:true,pathlen:0\n\
                 keyUsage = critical,keyCertSign,cRLSign\n\
                 subjectKeyIdentifier = hash\n\
                 authorityKeyIdentifier = keyid:always\n",
            );
        }
        CertificateTier::Device => {
            config.push_str(
                "[ v3_device ]\n\
                 keyUsage = critical,digitalSignature,keyAgreement\n\
                 extendedKeyUsage = critical,1.3.6.1.4.1.45605.1,clientAuth\n\
                 subjectAltName = critical,otherName:1.3.6.1.5.5.7.8.4;SEQ:id-on-hardwareModule\n\
                 authorityKeyIdentifier = keyid:always\n",
            );
            if let Some(hw) = profile.extensions.hardware_module() {
                config.push_str(&format!(
                    "\n[ id-on-hardwareModule ]\n\
                     hwtype = OID:{}\n\
                     hwserial = FORMAT:HEX,OCT:{}\n",
                    hw.hw_type, hw.hw_serial
                ));
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ExtensionProfile, HardwareModuleName, SubjectName};

    #[test]
    fn device_config_embeds_identity() {
        let profile = SigningProfile {
            tier: CertificateTier::Device,
            subject: SubjectName::device("Acme", "US"),
            serial: "0000000000000003".to_string(),
            extensions: ExtensionProfile::device(HardwareModuleName {
                hw_type: "1.2.3.4".to_string(),
                hw_serial: "0011223344556677".to_string(),
            }),
            validity_days: 3650,
        };
        let config = render_config(&profile);
        assert!(config.contains("[ v3_device ]"));
        assert!(config.contains("hwtype = OID:1.2.3.4"));
        assert!(config.contains("hwserial = FORMAT:HEX,OCT:0011223344556677"));
        assert!(config.contains("extendedKeyUsage = critical,1.3.6.1.4.1.45605.1,clientAuth"));
    }

    #[test]
    fn root_config_is_a_ca_profile() {
        let profile = SigningProfile {
            tier: CertificateTier::Root,
            subject: SubjectName::root("Acme", "US"),
            serial: "0000000000000001".to_string(),
            extensions: ExtensionProfile::root(),
            validity_days: 3650,
        };
        let config = render_config(&profile);
        assert!(config.contains("[ v3_root ]"));
        assert!(config.contains("basicConstraints = critical,CA:true"));
    }

    #[test]
    fn self_signed_root_round_trips_when_openssl_present() {
        let signer = OpensslSigner::new();
        if !signer.is_available() {
            eprintln!("skipping: openssl not on PATH");
            return;
        }
        let profile = SigningProfile {
            tier: CertificateTier::Root,
            subject: SubjectName::root("Acme", "US"),
            serial: "0000000000000001".to_string(),
            extensions: ExtensionProfile::root(),
            validity_days: 30,
        };
        let material = signer.create_self_signed(&profile).expect("self-signed");
        assert!(!material.certificate_der.is_empty());
        // DER certificates are a SEQUENCE.
        assert_eq!(material.certificate_der[0], 0x30);
        assert!(!material.private_key.is_empty());
    }
}
