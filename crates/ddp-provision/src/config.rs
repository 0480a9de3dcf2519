//! Run configuration and injection material.

use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::{ProvisionError, ProvisionResult};
use crate::soc::SocProfile;

/// Default bound for one command/response exchange.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for command-channel readiness after application start.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Target SoC variant.
    pub soc: SocProfile,
    /// Provisioning application image, loaded into RAM.
    pub app_image: Vec<u8>,
    /// Bound for each command/response exchange.
    pub exchange_timeout: Duration,
    /// Bound for command-channel readiness.
    pub start_timeout: Duration,
}

impl ProvisionConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ProvisionConfigBuilder {
        ProvisionConfigBuilder::default()
    }
}

/// Builder for [`ProvisionConfig`].
#[derive(Debug, Default)]
pub struct ProvisionConfigBuilder {
    soc: Option<SocProfile>,
    app_image: Option<Vec<u8>>,
    exchange_timeout: Option<Duration>,
    start_timeout: Option<Duration>,
}

impl ProvisionConfigBuilder {
    /// Set the target SoC profile.
    #[must_use]
    pub const fn soc(mut self, soc: SocProfile) -> Self {
        self.soc = Some(soc);
        self
    }

    /// Set the provisioning application image.
    #[must_use]
    pub fn app_image(mut self, image: impl Into<Vec<u8>>) -> Self {
        self.app_image = Some(image.into());
        self
    }

    /// Bound each command/response exchange.
    #[must_use]
    pub const fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = Some(timeout);
        self
    }

    /// Bound command-channel readiness.
    #[must_use]
    pub const fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Config`] if a required field is missing or
    /// the application image is empty.
    pub fn build(self) -> ProvisionResult<ProvisionConfig> {
        let missing = |field: &str| ProvisionError::Config {
            detail: format!("{field} is required"),
        };
        let app_image = self.app_image.ok_or_else(|| missing("app_image"))?;
        if app_image.is_empty() {
            return Err(ProvisionError::Config {
                detail: "app_image is empty".to_string(),
            });
        }
        Ok(ProvisionConfig {
            soc: self.soc.ok_or_else(|| missing("soc"))?,
            app_image,
            exchange_timeout: self.exchange_timeout.unwrap_or(DEFAULT_EXCHANGE_TIMEOUT),
            start_timeout: self.start_timeout.unwrap_or(DEFAULT_START_TIMEOUT),
        })
    }
}

/// Externally supplied material for the direct-injection branch.
///
/// Trusted CA certificates are written to sequential NVM slots in exactly
/// the order of this list; callers must supply a stable ordering.
#[derive(Default)]
pub struct InjectionMaterial {
    /// Device private key scalar, injected when present. Zeroized on drop.
    pub device_key: Option<Zeroizing<Vec<u8>>>,
    /// Device certificate (DER), written when present.
    pub device_cert: Option<Vec<u8>>,
    /// Trusted CA certificates (DER), slot order = list order.
    pub trusted_certs: Vec<Vec<u8>>,
}

impl std::fmt::Debug for InjectionMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionMaterial")
            .field("has_device_key", &self.device_key.is_some())
            .field("has_device_cert", &self.device_cert.is_some())
            .field("trusted_certs", &self.trusted_certs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::SOC_CATALOG;

    #[test]
    fn builder_applies_default_timeouts() {
        let config = ProvisionConfig::builder()
            .soc(SOC_CATALOG[0])
            .app_image(vec![0u8; 16])
            .build()
            .expect("build");
        assert_eq!(config.exchange_timeout, DEFAULT_EXCHANGE_TIMEOUT);
        assert_eq!(config.start_timeout, DEFAULT_START_TIMEOUT);
    }

    #[test]
    fn empty_image_is_a_configuration_error() {
        let result = ProvisionConfig::builder()
            .soc(SOC_CATALOG[0])
            .app_image(Vec::new())
            .build();
        assert!(matches!(result, Err(ProvisionError::Config { .. })));
    }
}
