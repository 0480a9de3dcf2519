//! Certificate store layout and persisted identity.
//!
//! The device OID and the OEM naming fields are fixed at setup time and
//! reused for every device this authority signs for. They are loaded once
//! when the authority opens and saved at setup; there is no implicit
//! open/close per access.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, AuthorityResult};

/// Device Object Identifier embedded in issued certificates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceOid(String);

impl DeviceOid {
    /// Wrap an OID in dotted-decimal form.
    #[must_use]
    pub fn new(oid: impl Into<String>) -> Self {
        Self(oid.into())
    }

    /// The OID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity persisted in the store at setup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreIdentity {
    /// Device Object Identifier.
    pub oid: DeviceOid,
    /// OEM organization name.
    pub organization: String,
    /// OEM country code.
    pub country: String,
    /// Batch identifier.
    pub batch_number: String,
}

/// File layout of an authority store directory.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    dir: PathBuf,
}

impl StoreLayout {
    /// Describe the layout rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persisted identity (device OID and OEM naming).
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    /// Serial/issuance ledger.
    #[must_use]
    pub fn ledger_file(&self) -> PathBuf {
        self.dir.join("ledger.jsonl")
    }

    /// Root certificate (DER).
    #[must_use]
    pub fn root_cert(&self) -> PathBuf {
        self.dir.join("root_cert.der")
    }

    /// Root private key (PEM).
    #[must_use]
    pub fn root_key(&self) -> PathBuf {
        self.dir.join("root_key.pem")
    }

    /// Batch certificate (DER).
    #[must_use]
    pub fn batch_cert(&self) -> PathBuf {
        self.dir.join("batch_cert.der")
    }

    /// Batch private key (PEM).
    #[must_use]
    pub fn batch_key(&self) -> PathBuf {
        self.dir.join("batch_key.pem")
    }

    /// Per-device certificate (DER), named by the device serial number.
    #[must_use]
    pub fn device_cert(&self, device_serial: &str) -> PathBuf {
        self.dir
            .join(format!("device_{}_cert.der", device_serial.to_lowercase()))
    }
}

/// Persist the identity into the store.
///
/// # Errors
///
/// Propagates filesystem and serialization failures.
pub fn save_identity(layout: &StoreLayout, identity: &StoreIdentity) -> AuthorityResult<()> {
    let contents =
        serde_json::to_string_pretty(identity).map_err(|e| AuthorityError::CorruptState {
            detail: format!("store config: {e}"),
        })?;
    fs::write(layout.config_file(), contents)?;
    Ok(())
}

/// Load the persisted identity, if the store has one.
///
/// # Errors
///
/// Returns [`AuthorityError::CorruptState`] when the configuration file
/// exists but cannot be parsed.
pub fn load_identity(layout: &StoreLayout) -> AuthorityResult<Option<StoreIdentity>> {
    let path = layout.config_file();
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)?;
    let identity: StoreIdentity =
        serde_json::from_str(&contents).map_err(|e| AuthorityError::CorruptState {
            detail: format!("store config: {e}"),
        })?;
    Ok(Some(identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identity_round_trips_through_the_store() {
        let dir = tempdir().expect("tempdir");
        let layout = StoreLayout::new(dir.path());
        let identity = StoreIdentity {
            oid: DeviceOid::new("1.2.3.4"),
            organization: "Acme".to_string(),
            country: "US".to_string(),
            batch_number: "Development".to_string(),
        };

        save_identity(&layout, &identity).expect("save");
        let loaded = load_identity(&layout).expect("load");
        assert_eq!(loaded, Some(identity));
    }

    #[test]
    fn missing_config_is_none() {
        let dir = tempdir().expect("tempdir");
        let layout = StoreLayout::new(dir.path());
        assert_eq!(load_identity(&layout).expect("load"), None);
    }
}
