//! Provisioning run phases.

/// Linear phase progression of one provisioning run.
///
/// The key and certificate phases occur only on the branch that exercises
/// them; teardown is reached on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPhase {
    /// No device contact yet.
    Disconnected,
    /// Probe connected, device halted.
    Connected,
    /// Provisioning application loaded and its command channel ready.
    ApplicationRunning,
    /// NVM object store initialized.
    NvmInitialized,
    /// Device key material present (generated or injected).
    KeyReady,
    /// Certificate request retrieved from the device.
    CsrObtained,
    /// Authority returned the signed chain.
    CertificatesIssued,
    /// Certificates written into their NVM slots.
    CertificatesWritten,
    /// Channel stopped, device reset, connection closed.
    TornDown,
}

impl std::fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::ApplicationRunning => "ApplicationRunning",
            Self::NvmInitialized => "NvmInitialized",
            Self::KeyReady => "KeyReady",
            Self::CsrObtained => "CsrObtained",
            Self::CertificatesIssued => "CertificatesIssued",
            Self::CertificatesWritten => "CertificatesWritten",
            Self::TornDown => "TornDown",
        };
        write!(f, "{name}")
    }
}
