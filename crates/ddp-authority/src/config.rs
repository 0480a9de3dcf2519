//! Authority configuration.

use std::path::PathBuf;

use crate::error::{AuthorityError, AuthorityResult};

/// Default batch identifier used when none is supplied.
pub const DEFAULT_BATCH_NUMBER: &str = "Development";

/// Default certificate validity in days.
pub const DEFAULT_VALIDITY_DAYS: u32 = 3650;

/// Configuration for one authority instance.
///
/// All state the authority touches is rooted here; there are no module-level
/// globals.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Directory holding keys, certificates, the ledger and the OID store.
    pub store_dir: PathBuf,
    /// OEM organization name embedded in subject names.
    pub organization: String,
    /// OEM country code embedded in subject names.
    pub country: String,
    /// Batch identifier embedded in the batch subject name.
    pub batch_number: String,
    /// Validity of issued certificates in days.
    pub validity_days: u32,
}

impl AuthorityConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> AuthorityConfigBuilder {
        AuthorityConfigBuilder::default()
    }
}

/// Builder for [`AuthorityConfig`].
#[derive(Debug, Default)]
pub struct AuthorityConfigBuilder {
    store_dir: Option<PathBuf>,
    organization: Option<String>,
    country: Option<String>,
    batch_number: Option<String>,
    validity_days: Option<u32>,
}

impl AuthorityConfigBuilder {
    /// Set the store directory.
    #[must_use]
    pub fn store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(path.into());
        self
    }

    /// Set the OEM organization name.
    #[must_use]
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the OEM country code.
    #[must_use]
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the batch identifier.
    #[must_use]
    pub fn batch_number(mut self, batch_number: impl Into<String>) -> Self {
        self.batch_number = Some(batch_number.into());
        self
    }

    /// Set the certificate validity in days.
    #[must_use]
    pub const fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = Some(days);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Config`] if a required field is missing.
    pub fn build(self) -> AuthorityResult<AuthorityConfig> {
        let missing = |field: &str| AuthorityError::Config {
            detail: format!("{field} is required"),
        };
        Ok(AuthorityConfig {
            store_dir: self.store_dir.ok_or_else(|| missing("store_dir"))?,
            organization: self.organization.ok_or_else(|| missing("organization"))?,
            country: self.country.ok_or_else(|| missing("country"))?,
            batch_number: self
                .batch_number
                .unwrap_or_else(|| DEFAULT_BATCH_NUMBER.to_string()),
            validity_days: self.validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
        })
    }
}
