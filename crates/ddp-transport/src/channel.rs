//! Device channel capability.

use thiserror::Error;

/// Errors reported by a [`DeviceChannel`] implementation.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Operation attempted before `connect` succeeded.
    #[error("channel is not connected")]
    NotConnected,

    /// Probe-side failure, reported verbatim.
    #[error("probe error: {message}")]
    Probe {
        /// Description from the probe backend.
        message: String,
    },

    /// I/O failure on the channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Build a probe error from any displayable backend failure.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }
}

/// Access to one physical device through a debug probe.
///
/// Implementations wrap whatever connection and register-access mechanism the
/// probe provides; the transport only relies on this narrow surface. The
/// channel is exclusively owned by one provisioning run; concurrent use
/// against the same device must be serialized by the caller.
pub trait DeviceChannel {
    /// Establish the probe connection to the device.
    fn connect(&mut self) -> Result<(), ChannelError>;

    /// Reset the device, optionally leaving it halted.
    fn reset(&mut self, halt: bool) -> Result<(), ChannelError>;

    /// Load an application image into RAM at `ram_addr` and start executing
    /// it (stack pointer and entry point are taken from the image header).
    fn run_image(&mut self, ram_addr: u32, image: &[u8]) -> Result<(), ChannelError>;

    /// Read the device's builtin EUI-64, as lowercase hex without separators.
    fn serial_number(&mut self) -> Result<String, ChannelError>;

    /// Begin command-channel processing on the device side.
    fn link_start(&mut self) -> Result<(), ChannelError>;

    /// Probe whether the command channel reports itself ready. Not-yet-ready
    /// conditions (including transient probe errors while the application
    /// boots) return `false`.
    fn link_ready(&mut self) -> bool;

    /// Stop command-channel processing.
    fn link_stop(&mut self) -> Result<(), ChannelError>;

    /// Offer `data` to the channel. Returns the number of bytes accepted,
    /// which is zero when the channel buffer is momentarily full.
    fn try_write(&mut self, data: &[u8]) -> Result<usize, ChannelError>;

    /// Read up to `max` bytes. Returns an empty buffer when nothing is
    /// pending.
    fn try_read(&mut self, max: usize) -> Result<Vec<u8>, ChannelError>;

    /// Close the probe connection.
    fn close(&mut self) -> Result<(), ChannelError>;
}
