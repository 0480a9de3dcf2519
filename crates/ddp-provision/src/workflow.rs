//! The provisioning state machine.

use ddp_authority::{Authority, CertificateChain, Signer};
use ddp_protocol::{Command, Operation, Response, Status};
use ddp_transport::{DeviceChannel, Transport};

use crate::config::{InjectionMaterial, ProvisionConfig};
use crate::error::{ProvisionError, ProvisionResult};
use crate::phase::ProvisionPhase;
use crate::slots::{
    trusted_cert_slot, DEVICE_KEY_ID, NVM_KEY_BATCH_CERT, NVM_KEY_DEVICE_CERT, NVM_KEY_ROOT_CERT,
};

/// Outcome of a successful on-device-generation run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// Device serial number, as read from the device itself.
    pub device_serial: String,
    /// The chain written into the device's NVM.
    pub chain: CertificateChain,
}

/// One single-use provisioning session against one connected device.
///
/// The session owns the channel for the duration of the run and tears it
/// down (stop the command channel, reset the device, close the connection)
/// on every exit path, success or failure.
pub struct ProvisionWorkflow<C> {
    config: ProvisionConfig,
    transport: Transport<C>,
    phase: ProvisionPhase,
}

impl<C: DeviceChannel> ProvisionWorkflow<C> {
    /// Create a session over `channel`.
    pub fn new(config: ProvisionConfig, channel: C) -> Self {
        Self {
            config,
            transport: Transport::new(channel),
            phase: ProvisionPhase::Disconnected,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ProvisionPhase {
        self.phase
    }

    /// Consume the session, returning the channel.
    pub fn into_channel(self) -> C {
        self.transport.into_inner()
    }

    /// Run the on-device-generation branch: the device generates its key
    /// pair and certificate request, `authority` signs, and the chain is
    /// written back into NVM.
    ///
    /// # Errors
    ///
    /// Any step failure aborts the run with the first failing step's error;
    /// teardown still happens. There is no rollback of NVM state already
    /// written.
    pub fn run_generation<S: Signer>(
        &mut self,
        authority: &mut Authority<S>,
    ) -> ProvisionResult<ProvisionReport> {
        self.check_unused()?;
        let outcome = self
            .connect()
            .and_then(|()| self.generation_sequence(authority));
        self.finish(outcome)
    }

    /// Run the direct-injection branch: inject externally supplied key and
    /// certificate material into the device.
    ///
    /// # Errors
    ///
    /// As for [`ProvisionWorkflow::run_generation`].
    pub fn run_injection(&mut self, material: &InjectionMaterial) -> ProvisionResult<()> {
        self.check_unused()?;
        let outcome = self
            .connect()
            .and_then(|()| self.injection_sequence(material));
        self.finish(outcome)
    }

    fn check_unused(&self) -> ProvisionResult<()> {
        if self.phase != ProvisionPhase::Disconnected {
            return Err(ProvisionError::Config {
                detail: format!("session already used (phase {})", self.phase),
            });
        }
        Ok(())
    }

    /// Resolve the run outcome, always tearing the session down first.
    fn finish<T>(&mut self, outcome: ProvisionResult<T>) -> ProvisionResult<T> {
        let teardown = self.teardown();
        match outcome {
            Ok(value) => {
                teardown?;
                Ok(value)
            }
            Err(err) => {
                // The run error is what the operator needs; a teardown
                // failure on top of it is only logged.
                if let Err(teardown_err) = teardown {
                    tracing::error!(error = %teardown_err, "teardown failed after run error");
                }
                Err(err)
            }
        }
    }

    fn teardown(&mut self) -> ProvisionResult<()> {
        tracing::info!("tearing down provisioning session");
        let stopped = self.transport.stop();
        let reset = self.transport.channel_mut().reset(false);
        let closed = self.transport.channel_mut().close();
        self.phase = ProvisionPhase::TornDown;
        stopped?;
        reset?;
        closed?;
        Ok(())
    }

    fn connect(&mut self) -> ProvisionResult<()> {
        tracing::info!("opening debug connection to the device");
        let channel = self.transport.channel_mut();
        channel.connect()?;
        channel.reset(true)?;
        self.phase = ProvisionPhase::Connected;
        tracing::info!("connection opened");
        Ok(())
    }

    fn start_application(&mut self) -> ProvisionResult<()> {
        tracing::info!("injecting provisioning application");
        let ram_base = self.config.soc.ram_base;
        self.transport
            .channel_mut()
            .run_image(ram_base, &self.config.app_image)?;
        self.transport.start(self.config.start_timeout)?;
        self.phase = ProvisionPhase::ApplicationRunning;
        tracing::info!("provisioning application running");
        Ok(())
    }

    fn initialize_nvm(&mut self) -> ProvisionResult<()> {
        tracing::info!("initializing NVM");
        let response = self.exchange(&Command::InitializeNvm {
            base_addr: self.config.soc.nvm_base,
            size: self.config.soc.nvm_size,
        })?;
        require_success(Operation::InitializeNvm, &response)?;
        self.phase = ProvisionPhase::NvmInitialized;
        tracing::info!("NVM initialized");
        Ok(())
    }

    fn generation_sequence<S: Signer>(
        &mut self,
        authority: &mut Authority<S>,
    ) -> ProvisionResult<ProvisionReport> {
        tracing::info!("retrieving device serial number");
        let device_serial = self.transport.channel_mut().serial_number()?;
        tracing::info!(serial = %device_serial, "device serial number retrieved");

        self.start_application()?;
        self.initialize_nvm()?;

        tracing::info!("generating device key pair on the device");
        let response = self.exchange(&Command::GenerateKeyPair {
            key_id: DEVICE_KEY_ID,
        })?;
        if response.status == Status::ALREADY_EXISTS {
            tracing::warn!("device key pair already exists");
        } else {
            require_success(Operation::GenerateKeyPair, &response)?;
            tracing::info!("device key pair generated");
        }
        self.phase = ProvisionPhase::KeyReady;

        tracing::info!("generating certificate request on the device");
        let response = self.exchange(&Command::GenerateCsr {
            key_id: DEVICE_KEY_ID,
        })?;
        require_success(Operation::GenerateCsr, &response)?;
        let csr = response.payload.ok_or(ProvisionError::MissingPayload {
            step: Operation::GenerateCsr,
        })?;
        self.phase = ProvisionPhase::CsrObtained;
        tracing::info!(csr_len = csr.len(), "certificate request retrieved");

        tracing::info!("requesting device certificate chain");
        let oid = authority.device_oid()?.clone();
        let chain = authority.issue_device_certificate(&oid, &device_serial, &csr)?;
        self.phase = ProvisionPhase::CertificatesIssued;
        tracing::info!("device certificate chain issued");

        self.write_nvm("device certificate", NVM_KEY_DEVICE_CERT, chain.device.clone())?;
        self.write_nvm("batch certificate", NVM_KEY_BATCH_CERT, chain.batch.clone())?;
        self.write_nvm("root certificate", NVM_KEY_ROOT_CERT, chain.root.clone())?;
        self.phase = ProvisionPhase::CertificatesWritten;

        Ok(ProvisionReport {
            device_serial,
            chain,
        })
    }

    fn injection_sequence(&mut self, material: &InjectionMaterial) -> ProvisionResult<()> {
        self.start_application()?;
        self.initialize_nvm()?;

        if let Some(key) = &material.device_key {
            tracing::info!("injecting device private key");
            let response = self.exchange(&Command::InjectWisunKey {
                key_id: DEVICE_KEY_ID,
                key: key.to_vec(),
            })?;
            require_success(Operation::InjectWisunKey, &response)?;
            self.phase = ProvisionPhase::KeyReady;
            tracing::info!("device private key injected");
        }

        if let Some(cert) = &material.device_cert {
            self.write_nvm("device certificate", NVM_KEY_DEVICE_CERT, cert.clone())?;
        }

        for (index, cert) in material.trusted_certs.iter().enumerate() {
            let slot = trusted_cert_slot(index as u32);
            tracing::info!(index, slot, "saving trusted CA certificate");
            self.write_nvm("trusted CA certificate", slot, cert.clone())?;
        }
        self.phase = ProvisionPhase::CertificatesWritten;
        Ok(())
    }

    fn write_nvm(&mut self, what: &str, key: u32, data: Vec<u8>) -> ProvisionResult<()> {
        tracing::info!(what, key = %format_args!("{key:#06x}"), "saving object into NVM");
        let response = self.exchange(&Command::WriteNvm { key, data })?;
        require_success(Operation::WriteNvm, &response)?;
        tracing::info!(what, "object saved");
        Ok(())
    }

    fn exchange(&mut self, command: &Command) -> ProvisionResult<Response> {
        let frame = command.encode()?;
        let raw = self
            .transport
            .send_receive(&frame, self.config.exchange_timeout)?;
        Ok(Response::decode(command.operation(), &raw)?)
    }
}

/// Check that a step's response is exactly the success status.
fn require_success(step: Operation, response: &Response) -> ProvisionResult<()> {
    if response.status.is_success() {
        Ok(())
    } else {
        Err(ProvisionError::Protocol {
            step,
            status: response.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_maps_to_protocol_error() {
        let response = Response {
            status: Status(7),
            body: Vec::new(),
            payload: None,
        };
        let err = require_success(Operation::WriteNvm, &response).expect_err("status 7");
        assert!(matches!(
            err,
            ProvisionError::Protocol {
                step: Operation::WriteNvm,
                status: Status(7)
            }
        ));
    }
}
