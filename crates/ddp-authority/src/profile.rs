//! Certificate tiers, subject names and tier extension profiles.
//!
//! Extension profiles are fixed per tier: every device certificate an
//! authority instance ever issues carries the same extension shape,
//! differing only in the embedded OID/serial values and in subject naming.

use serde::{Deserialize, Serialize};

/// Position in the certificate hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateTier {
    /// Self-signed trust anchor.
    Root,
    /// Production-batch intermediate, signed by Root.
    Batch,
    /// Per-device leaf, signed by Batch.
    Device,
}

impl std::fmt::Display for CertificateTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Batch => "batch",
            Self::Device => "device",
        };
        write!(f, "{name}")
    }
}

/// Subject distinguished name, deterministic per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectName {
    /// Common name. Device certificates set none: their identity lives in
    /// the hardware-module alternative name, not the subject.
    pub common_name: Option<String>,
    /// Organization.
    pub organization: String,
    /// Country code.
    pub country: String,
}

impl SubjectName {
    /// Root subject: `CN={org} {country} WiSun Root`.
    #[must_use]
    pub fn root(organization: &str, country: &str) -> Self {
        Self {
            common_name: Some(format!("{organization} {country} WiSun Root")),
            organization: organization.to_string(),
            country: country.to_string(),
        }
    }

    /// Batch subject: `CN=Batch ({batch_number})`.
    #[must_use]
    pub fn batch(organization: &str, country: &str, batch_number: &str) -> Self {
        Self {
            common_name: Some(format!("Batch ({batch_number})")),
            organization: organization.to_string(),
            country: country.to_string(),
        }
    }

    /// Device subject: no distinguishing common name.
    #[must_use]
    pub fn device(organization: &str, country: &str) -> Self {
        Self {
            common_name: None,
            organization: organization.to_string(),
            country: country.to_string(),
        }
    }
}

impl std::fmt::Display for SubjectName {
    /// Renders as a slash-separated DN (`/CN=../O=../C=..`).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(cn) = &self.common_name {
            write!(f, "/CN={cn}")?;
        }
        write!(f, "/O={}/C={}", self.organization, self.country)
    }
}

/// Hardware-module identity embedded in device certificates as an
/// `id-on-hardwareModule` alternative name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareModuleName {
    /// Device Object Identifier (hwType).
    pub hw_type: String,
    /// Device serial number as hex octets (hwSerial).
    pub hw_serial: String,
}

/// Fixed extension set for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProfile {
    tier: CertificateTier,
    hardware_module: Option<HardwareModuleName>,
}

impl ExtensionProfile {
    /// Root profile: CA constraints and certificate-signing key usage.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            tier: CertificateTier::Root,
            hardware_module: None,
        }
    }

    /// Batch profile: CA constraints limited to leaf issuance.
    #[must_use]
    pub const fn batch() -> Self {
        Self {
            tier: CertificateTier::Batch,
            hardware_module: None,
        }
    }

    /// Device profile: critical key-usage/extended-key-usage plus the
    /// hardware-module alternative name carrying `identity`.
    #[must_use]
    pub const fn device(identity: HardwareModuleName) -> Self {
        Self {
            tier: CertificateTier::Device,
            hardware_module: Some(identity),
        }
    }

    /// Tier this profile belongs to.
    #[must_use]
    pub const fn tier(&self) -> CertificateTier {
        self.tier
    }

    /// Extension section name, per tier.
    #[must_use]
    pub const fn section_name(&self) -> &'static str {
        match self.tier {
            CertificateTier::Root => "v3_root",
            CertificateTier::Batch => "v3_batch",
            CertificateTier::Device => "v3_device",
        }
    }

    /// Hardware-module identity, present only on device profiles.
    #[must_use]
    pub const fn hardware_module(&self) -> Option<&HardwareModuleName> {
        self.hardware_module.as_ref()
    }
}

/// Everything a [`crate::Signer`] needs to produce one certificate.
#[derive(Debug, Clone)]
pub struct SigningProfile {
    /// Tier of the certificate being produced.
    pub tier: CertificateTier,
    /// Subject name to set.
    pub subject: SubjectName,
    /// Ledger-allocated certificate serial, 16 hex digits.
    pub serial: String,
    /// Tier extension profile.
    pub extensions: ExtensionProfile,
    /// Validity in days.
    pub validity_days: u32,
}
