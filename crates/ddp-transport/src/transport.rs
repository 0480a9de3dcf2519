//! Synchronous request/response exchange with timeout discipline.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::channel::{ChannelError, DeviceChannel};

/// Errors reported by the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bounded wait elapsed without the expected condition.
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// What the transport was waiting for.
        what: &'static str,
        /// How long it waited.
        waited: Duration,
    },

    /// Failure reported by the underlying channel.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Tuning knobs for the polling loops.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// Sleep between readiness/read/write polls.
    pub poll_interval: Duration,
    /// Maximum bytes consumed per read poll.
    pub read_chunk: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            read_chunk: 1024,
        }
    }
}

/// Request/response transport over one [`DeviceChannel`].
///
/// The transport enforces the single-outstanding-request discipline and the
/// timeout bounds; it has no knowledge of the frames it moves. Retry of a
/// failed exchange is not offered here: only the caller knows whether an
/// operation is idempotent.
#[derive(Debug)]
pub struct Transport<C> {
    channel: C,
    config: TransportConfig,
}

impl<C: DeviceChannel> Transport<C> {
    /// Wrap a channel with default polling configuration.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, TransportConfig::default())
    }

    /// Wrap a channel with explicit polling configuration.
    pub const fn with_config(channel: C, config: TransportConfig) -> Self {
        Self { channel, config }
    }

    /// Access the underlying channel for device-control operations.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the transport, returning the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Start the command channel and block until it reports ready.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if readiness is not observed
    /// within `timeout`, or the channel's error if starting fails outright.
    pub fn start(&mut self, timeout: Duration) -> TransportResult<()> {
        self.channel.link_start()?;
        let started = Instant::now();
        while started.elapsed() < timeout {
            if self.channel.link_ready() {
                tracing::debug!(elapsed = ?started.elapsed(), "command channel ready");
                return Ok(());
            }
            std::thread::sleep(self.config.poll_interval);
        }
        Err(TransportError::Timeout {
            what: "command channel readiness",
            waited: timeout,
        })
    }

    /// Stop the command channel.
    ///
    /// # Errors
    ///
    /// Propagates the channel's failure to stop.
    pub fn stop(&mut self) -> TransportResult<()> {
        self.channel.link_stop()?;
        Ok(())
    }

    /// Send one frame and wait for exactly one response frame.
    ///
    /// The send side is retried while the channel accepts zero bytes (its
    /// buffer may be momentarily full); a partial accept is not retried.
    /// The receive side polls until at least one byte is available. Both
    /// sides are bounded by `timeout` independently.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if the frame is never accepted or
    /// no response bytes arrive in time. Never returns an empty success.
    pub fn send_receive(&mut self, frame: &[u8], timeout: Duration) -> TransportResult<Vec<u8>> {
        self.send(frame, timeout)?;
        self.receive(timeout)
    }

    fn send(&mut self, frame: &[u8], timeout: Duration) -> TransportResult<()> {
        let started = Instant::now();
        loop {
            let accepted = self.channel.try_write(frame)?;
            if accepted > 0 {
                if accepted < frame.len() {
                    tracing::warn!(
                        accepted,
                        frame_len = frame.len(),
                        "channel accepted a partial frame"
                    );
                }
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(TransportError::Timeout {
                    what: "frame accept",
                    waited: timeout,
                });
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    fn receive(&mut self, timeout: Duration) -> TransportResult<Vec<u8>> {
        let started = Instant::now();
        loop {
            let data = self.channel.try_read(self.config.read_chunk)?;
            if !data.is_empty() {
                return Ok(data);
            }
            if started.elapsed() >= timeout {
                return Err(TransportError::Timeout {
                    what: "response bytes",
                    waited: timeout,
                });
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }
}
