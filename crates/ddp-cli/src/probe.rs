//! Debug-probe channel adapter.
//!
//! Implements [`DeviceChannel`] for a J-Link-style setup: device control
//! (reset, halt, flashing the provisioning application) is delegated to the
//! `commander` utility, and the command channel is the probe's RTT bridge
//! exposed as a local TCP endpoint. This is the one place the tooling
//! assumes concrete probe mechanics; everything above the channel trait is
//! agnostic.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use ddp_transport::{ChannelError, DeviceChannel};

/// Default RTT bridge endpoint (J-Link RTT telnet port).
pub const DEFAULT_RTT_ENDPOINT: &str = "127.0.0.1:19021";

/// How the probe utility addresses the adapter.
#[derive(Debug, Clone)]
pub enum ProbeTarget {
    /// USB probe by serial number.
    SerialNo(String),
    /// Networked probe by host name or IP address.
    Host(String),
}

impl ProbeTarget {
    fn args(&self) -> [String; 2] {
        match self {
            Self::SerialNo(serial) => ["--serialno".to_string(), serial.clone()],
            Self::Host(host) => ["--ip".to_string(), host.clone()],
        }
    }
}

/// Probe selection flags shared by the device-facing subcommands.
#[derive(Debug, clap::Args)]
pub struct ProbeArgs {
    /// Probe serial number (USB interface).
    #[arg(long)]
    pub probe_serial: Option<String>,

    /// Probe host name or IP address (Ethernet interface).
    #[arg(long)]
    pub probe_host: Option<String>,

    /// Probe utility binary.
    #[arg(long, default_value = "commander")]
    pub commander: std::path::PathBuf,

    /// RTT bridge TCP endpoint.
    #[arg(long, default_value = DEFAULT_RTT_ENDPOINT)]
    pub rtt_endpoint: String,
}

impl ProbeArgs {
    /// Build a channel to the device `part`.
    pub fn channel(&self, part: &str) -> anyhow::Result<CommanderChannel> {
        let target = match (&self.probe_serial, &self.probe_host) {
            (Some(serial), None) => ProbeTarget::SerialNo(serial.clone()),
            (None, Some(host)) => ProbeTarget::Host(host.clone()),
            (Some(_), Some(_)) => {
                anyhow::bail!("--probe-serial and --probe-host are mutually exclusive")
            }
            (None, None) => anyhow::bail!("no probe serial number or host specified"),
        };
        Ok(CommanderChannel::new(part, target)
            .with_binary(&self.commander)
            .with_rtt_endpoint(self.rtt_endpoint.as_str()))
    }
}

/// [`DeviceChannel`] backed by the `commander` utility and an RTT TCP
/// bridge.
#[derive(Debug)]
pub struct CommanderChannel {
    binary: PathBuf,
    part: String,
    target: ProbeTarget,
    rtt_endpoint: String,
    stream: Option<TcpStream>,
    cached_serial: Option<String>,
}

impl CommanderChannel {
    /// Build a channel for `part` reachable through `target`.
    #[must_use]
    pub fn new(part: impl Into<String>, target: ProbeTarget) -> Self {
        Self {
            binary: PathBuf::from("commander"),
            part: part.into(),
            target,
            rtt_endpoint: DEFAULT_RTT_ENDPOINT.to_string(),
            stream: None,
            cached_serial: None,
        }
    }

    /// Override the probe utility binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Override the RTT bridge endpoint.
    #[must_use]
    pub fn with_rtt_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rtt_endpoint = endpoint.into();
        self
    }

    fn run(&self, args: &[&str]) -> Result<String, ChannelError> {
        let target = self.target.args();
        let output = Command::new(&self.binary)
            .args(args)
            .args(&target)
            .output()
            .map_err(|e| ChannelError::probe(format!("spawning probe tool: {e}")))?;
        if !output.status.success() {
            return Err(ChannelError::probe(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("ERROR") {
            return Err(ChannelError::probe(stdout.trim().to_string()));
        }
        Ok(stdout.into_owned())
    }

    fn device_info(&self) -> Result<String, ChannelError> {
        self.run(&["device", "info", "--device", &self.part])
    }
}

impl DeviceChannel for CommanderChannel {
    fn connect(&mut self) -> Result<(), ChannelError> {
        let info = self.device_info()?;
        for line in info.lines() {
            if let Some((key, value)) = line.split_once(':') {
                if key.trim() == "Unique ID" {
                    self.cached_serial = Some(value.trim().to_lowercase());
                }
            }
        }
        Ok(())
    }

    fn reset(&mut self, halt: bool) -> Result<(), ChannelError> {
        self.run(&["device", "reset", "--device", &self.part])?;
        if halt {
            self.run(&["device", "halt", "--device", &self.part])?;
        }
        Ok(())
    }

    fn run_image(&mut self, ram_addr: u32, image: &[u8]) -> Result<(), ChannelError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("provisioning_app.bin");
        std::fs::write(&path, image)?;
        let address = format!("{ram_addr:#010x}");
        let path_arg = path.display().to_string();
        self.run(&["flash", &path_arg, "--address", &address, "--device", &self.part])?;
        Ok(())
    }

    fn serial_number(&mut self) -> Result<String, ChannelError> {
        if self.cached_serial.is_none() {
            self.connect()?;
        }
        self.cached_serial
            .clone()
            .ok_or_else(|| ChannelError::probe("probe reported no Unique ID"))
    }

    fn link_start(&mut self) -> Result<(), ChannelError> {
        let addr = self
            .rtt_endpoint
            .to_socket_addrs()
            .map_err(|e| ChannelError::probe(format!("RTT endpoint: {e}")))?
            .next()
            .ok_or_else(|| ChannelError::probe("RTT endpoint resolved to no address"))?;
        let stream = TcpStream::connect_timeout(&addr, Duration::from_secs(5))?;
        stream.set_nonblocking(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn link_ready(&mut self) -> bool {
        self.stream.is_some()
    }

    fn link_stop(&mut self) -> Result<(), ChannelError> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }

    fn try_write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        let stream = self.stream.as_mut().ok_or(ChannelError::NotConnected)?;
        match stream.write(data) {
            Ok(written) => Ok(written),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn try_read(&mut self, max: usize) -> Result<Vec<u8>, ChannelError> {
        let stream = self.stream.as_mut().ok_or(ChannelError::NotConnected)?;
        let mut buf = vec![0u8; max];
        match stream.read(&mut buf) {
            Ok(0) => Err(ChannelError::probe("command channel closed by peer")),
            Ok(read) => {
                buf.truncate(read);
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.stream = None;
        Ok(())
    }
}
