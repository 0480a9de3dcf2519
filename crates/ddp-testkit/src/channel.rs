//! Programmable device channels.

use std::collections::VecDeque;

use ddp_transport::{ChannelError, DeviceChannel};

/// Build a response frame: status, body length, body.
#[must_use]
pub fn response_frame(status: u32, body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(6 + body.len());
    frame.extend_from_slice(&status.to_le_bytes());
    frame.extend_from_slice(&u16::try_from(body.len()).unwrap_or(u16::MAX).to_le_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Build a successful response frame whose body is a length-prefixed
/// payload, as the generate operations produce.
#[must_use]
pub fn payload_response_frame(status: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.extend_from_slice(&u32::try_from(payload.len()).unwrap_or(u32::MAX).to_le_bytes());
    body.extend_from_slice(payload);
    response_frame(status, &body)
}

/// Everything a run did to the channel, for assertions.
#[derive(Debug, Default)]
pub struct ChannelLog {
    /// Frames written by the transport, in order.
    pub frames: Vec<Vec<u8>>,
    /// `reset(halt)` calls, in order.
    pub resets: Vec<bool>,
    /// Images loaded via `run_image` (address, image length).
    pub images: Vec<(u32, usize)>,
    /// Whether the link was started.
    pub link_started: bool,
    /// Whether the link was stopped.
    pub link_stopped: bool,
    /// Whether the connection was closed.
    pub closed: bool,
}

/// A [`DeviceChannel`] that replays a queue of canned response frames and
/// records every interaction.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    serial: String,
    responses: VecDeque<Vec<u8>>,
    /// Interaction record.
    pub log: ChannelLog,
    pending: VecDeque<u8>,
}

impl ScriptedChannel {
    /// Channel for a device with the given serial number.
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            ..Self::default()
        }
    }

    /// Queue a raw response frame for the next exchange.
    pub fn push_response(&mut self, frame: Vec<u8>) {
        self.responses.push_back(frame);
    }

    /// Queue a bodyless response with the given status.
    pub fn push_status(&mut self, status: u32) {
        self.push_response(response_frame(status, &[]));
    }

    /// Queue a successful response carrying a length-prefixed payload.
    pub fn push_payload(&mut self, payload: &[u8]) {
        self.push_response(payload_response_frame(0, payload));
    }
}

impl DeviceChannel for ScriptedChannel {
    fn connect(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn reset(&mut self, halt: bool) -> Result<(), ChannelError> {
        self.log.resets.push(halt);
        Ok(())
    }

    fn run_image(&mut self, ram_addr: u32, image: &[u8]) -> Result<(), ChannelError> {
        self.log.images.push((ram_addr, image.len()));
        Ok(())
    }

    fn serial_number(&mut self) -> Result<String, ChannelError> {
        Ok(self.serial.clone())
    }

    fn link_start(&mut self) -> Result<(), ChannelError> {
        self.log.link_started = true;
        Ok(())
    }

    fn link_ready(&mut self) -> bool {
        true
    }

    fn link_stop(&mut self) -> Result<(), ChannelError> {
        self.log.link_stopped = true;
        Ok(())
    }

    fn try_write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        self.log.frames.push(data.to_vec());
        if let Some(response) = self.responses.pop_front() {
            self.pending.extend(response);
        }
        Ok(data.len())
    }

    fn try_read(&mut self, max: usize) -> Result<Vec<u8>, ChannelError> {
        let take = self.pending.len().min(max);
        Ok(self.pending.drain(..take).collect())
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        self.log.closed = true;
        Ok(())
    }
}

/// A [`DeviceChannel`] that answers every command with a successful response
/// whose body is the command's body, byte for byte.
#[derive(Debug, Default)]
pub struct LoopbackChannel {
    pending: VecDeque<u8>,
}

impl LoopbackChannel {
    /// New loopback channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceChannel for LoopbackChannel {
    fn connect(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn reset(&mut self, _halt: bool) -> Result<(), ChannelError> {
        Ok(())
    }

    fn run_image(&mut self, _ram_addr: u32, _image: &[u8]) -> Result<(), ChannelError> {
        Ok(())
    }

    fn serial_number(&mut self) -> Result<String, ChannelError> {
        Ok("0011223344556677".to_string())
    }

    fn link_start(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn link_ready(&mut self) -> bool {
        true
    }

    fn link_stop(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn try_write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        // Command frame: tag (2) + body length (2) + body.
        if data.len() >= ddp_protocol::FRAME_HEADER_LEN {
            let body = &data[ddp_protocol::FRAME_HEADER_LEN..];
            self.pending.extend(response_frame(0, body));
        }
        Ok(data.len())
    }

    fn try_read(&mut self, max: usize) -> Result<Vec<u8>, ChannelError> {
        let take = self.pending.len().min(max);
        Ok(self.pending.drain(..take).collect())
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}
