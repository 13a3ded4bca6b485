//! The serial link handler.
//!
//! [`SerialLink`] owns at most one open channel together with the receive
//! buffer that holds the most recent read. It provides three things:
//!
//! - **Lifecycle**: [`open`](SerialLink::open), [`close`](SerialLink::close)
//!   and [`status`](SerialLink::status)
//! - **Access guard**: every read and write runs its whole critical section
//!   (readiness wait, read and buffer copy, or write and drain) under one
//!   mutex, so callers on different threads never interleave on the channel
//!   and never see a half-copied buffer
//! - **Frame hand-off**: reads return a [`RawFrame`] copy which the caller
//!   validates with [`gimbal_protocol::validate`]
//!
//! `close` must be sequenced after in-flight operations by the caller; it
//! does not interrupt a read or write that is waiting on the channel.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gimbal_metrics::{metric_defs, LinkLabels};
use gimbal_protocol::{
    pad_command, validate, Frame, ValidationResult, FRAME_BUFFER_SIZE, RECEIVE_CHUNK_SIZE,
};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::channel::{Channel, Connector};
use crate::config::{BaudRate, LinkConfig};
use crate::error::{OpenError, ReadOutcome, WriteError};
use crate::serial::SerialConnector;

// ============================================================================
// Types
// ============================================================================

/// Whether the link currently holds an open channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// No channel is held. Reads and writes fail with `NotOpen`.
    Closed,
    /// A channel was opened and not yet released.
    Open,
}

/// Copy of the receive buffer after a read.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: [u8; FRAME_BUFFER_SIZE],
    bytes_read: usize,
}

impl RawFrame {
    /// The whole buffer. Bytes past the read are zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes the read call returned.
    ///
    /// May exceed the buffer capacity; the excess was discarded.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// The bytes of the read that fit in the buffer.
    pub fn received(&self) -> &[u8] {
        &self.bytes[..self.bytes_read.min(FRAME_BUFFER_SIZE)]
    }

    /// Classify the buffer contents.
    pub fn validate(&self) -> ValidationResult {
        validate(&self.bytes, self.bytes_read)
    }

    /// Borrow a validated frame view.
    pub fn frame(&self) -> Result<Frame<'_>, ValidationResult> {
        Frame::parse(&self.bytes, self.bytes_read)
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("bytes_read", &self.bytes_read)
            .field("received", &self.received())
            .finish()
    }
}

/// A read together with its validation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// The bytes read.
    pub frame: RawFrame,
    /// Outcome of validating them.
    pub result: ValidationResult,
}

/// Fixed-capacity storage for the most recent read.
struct ReceiveBuffer {
    bytes: [u8; FRAME_BUFFER_SIZE],
    bytes_read: usize,
}

impl ReceiveBuffer {
    fn new() -> Self {
        ReceiveBuffer {
            bytes: [0; FRAME_BUFFER_SIZE],
            bytes_read: 0,
        }
    }

    /// Overwrite with `chunk`, zeroing whatever the chunk does not cover.
    fn store(&mut self, chunk: &[u8]) {
        let n = chunk.len().min(FRAME_BUFFER_SIZE);
        self.bytes[..n].copy_from_slice(&chunk[..n]);
        self.bytes[n..].fill(0);
        self.bytes_read = chunk.len();
    }

    fn clear(&mut self) {
        self.store(&[]);
    }

    fn snapshot(&self) -> RawFrame {
        RawFrame {
            bytes: self.bytes,
            bytes_read: self.bytes_read,
        }
    }
}

/// An open channel and the configuration it was opened with.
struct Session {
    channel: Box<dyn Channel>,
    config: LinkConfig,
    labels: LinkLabels,
}

/// Everything the access guard protects.
struct LinkState {
    session: Option<Session>,
    scratch: [u8; RECEIVE_CHUNK_SIZE],
    buffer: ReceiveBuffer,
}

// ============================================================================
// Serial Link
// ============================================================================

/// Handler for the single serial link to the gimbal controller.
///
/// Share it between threads with an `Arc`.
pub struct SerialLink {
    connector: Box<dyn Connector>,
    state: Mutex<LinkState>,
    /// Mirrors `state.session.is_some()` so status never waits on I/O.
    open: AtomicBool,
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLink {
    /// Create a closed link that opens real serial ports.
    pub fn new() -> Self {
        Self::with_connector(SerialConnector)
    }

    /// Create a closed link that opens channels through `connector`.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        SerialLink {
            connector: Box::new(connector),
            state: Mutex::new(LinkState {
                session: None,
                scratch: [0; RECEIVE_CHUNK_SIZE],
                buffer: ReceiveBuffer::new(),
            }),
            open: AtomicBool::new(false),
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Open and configure the device named by `config`.
    ///
    /// The baud rate is checked before the device is touched. On any error
    /// the link stays closed.
    pub fn open(&self, config: LinkConfig) -> Result<(), OpenError> {
        let mut state = self.state.lock();
        if let Some(session) = &state.session {
            return Err(OpenError::AlreadyOpen {
                device: session.config.device.clone(),
            });
        }

        let labels = LinkLabels::new(config.device.as_str());
        let channel = match BaudRate::try_from(config.baud_rate)
            .and_then(|baud_rate| self.connector.connect(&config, baud_rate))
        {
            Ok(channel) => channel,
            Err(e) => {
                warn!(device = %config.device, baud = config.baud_rate, "open failed: {}", e);
                metrics::counter!(
                    metric_defs::LINK_OPEN_FAILURES.name,
                    &labels.with(&[("reason", e.reason().to_string())])
                )
                .increment(1);
                return Err(e);
            }
        };

        info!(
            device = %config.device,
            baud = config.baud_rate,
            "connected with {} data bits, {}, {} stop bit(s)",
            config.data_bits,
            if config.parity { "even parity" } else { "no parity" },
            config.stop_bits
        );
        metrics::counter!(metric_defs::LINK_OPENS.name, &labels.to_labels()).increment(1);

        state.buffer.clear();
        state.session = Some(Session {
            channel,
            config,
            labels,
        });
        self.open.store(true, Ordering::Release);
        Ok(())
    }

    /// Release the channel.
    ///
    /// The link is closed afterwards even if the release reports an error;
    /// that error is logged and returned. Closing a closed link does nothing.
    pub fn close(&self) -> io::Result<()> {
        let session = {
            let mut state = self.state.lock();
            let session = state.session.take();
            self.open.store(false, Ordering::Release);
            session
        };

        let Some(session) = session else {
            return Ok(());
        };

        info!(device = %session.config.device, "closing link");
        let labels = session.labels;
        session.channel.release().map_err(|e| {
            warn!(device = %labels.device, "error on port close: {}", e);
            metrics::counter!(
                metric_defs::LINK_IO_ERRORS.name,
                &labels.with(&[("op", "close".to_string())])
            )
            .increment(1);
            e
        })
    }

    /// Current status. Never blocks.
    pub fn status(&self) -> LinkStatus {
        if self.open.load(Ordering::Acquire) {
            LinkStatus::Open
        } else {
            LinkStatus::Closed
        }
    }

    /// Configuration of the open session.
    pub fn config(&self) -> Option<LinkConfig> {
        self.state.lock().session.as_ref().map(|s| s.config.clone())
    }

    // ------------------------------------------------------------------------
    // Guarded I/O
    // ------------------------------------------------------------------------

    /// Wait up to `timeout` for input and read one chunk into the receive buffer.
    pub fn read_frame(&self, timeout: Duration) -> Result<RawFrame, ReadOutcome> {
        let mut state = self.state.lock();
        Self::read_locked(&mut state, Some(timeout))
    }

    /// [`read_frame`](Self::read_frame) with the session's configured timeout.
    pub fn read_frame_default(&self) -> Result<RawFrame, ReadOutcome> {
        let mut state = self.state.lock();
        Self::read_locked(&mut state, None)
    }

    /// Read with the configured timeout and validate the result.
    ///
    /// Validation happens after the guard is released.
    pub fn receive(&self) -> Result<Received, ReadOutcome> {
        let (frame, labels) = {
            let mut state = self.state.lock();
            let frame = Self::read_locked(&mut state, None)?;
            let labels = state
                .session
                .as_ref()
                .map(|s| s.labels.clone())
                .unwrap_or_else(|| LinkLabels::new(""));
            (frame, labels)
        };

        let result = frame.validate();
        metrics::counter!(
            metric_defs::FRAME_VALIDATIONS.name,
            &labels.with(&[("result", result.as_str().to_string())])
        )
        .increment(1);
        if result.is_valid() {
            trace!(device = %labels.device, bytes = frame.bytes_read(), "valid frame");
        } else {
            debug!(
                device = %labels.device,
                bytes = frame.bytes_read(),
                code = result.code(),
                "{}",
                result
            );
        }

        Ok(Received { frame, result })
    }

    /// Copy of the receive buffer as left by the last read.
    pub fn last_frame(&self) -> RawFrame {
        self.state.lock().buffer.snapshot()
    }

    /// Write `bytes[..length]` and wait until it has been transmitted.
    ///
    /// Returns the number of bytes the channel accepted, which may be short.
    pub fn write_frame(&self, bytes: &[u8], length: usize) -> Result<usize, WriteError> {
        if length > bytes.len() {
            return Err(WriteError::LengthOutOfRange {
                length,
                available: bytes.len(),
            });
        }
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(WriteError::NotOpen)?;
        Self::write_locked(session, &bytes[..length])
    }

    /// Write a command padded with zeros to the session's fixed command size.
    pub fn write_command(&self, command: &[u8]) -> Result<usize, WriteError> {
        let mut state = self.state.lock();
        let session = state.session.as_mut().ok_or(WriteError::NotOpen)?;
        let command_size = session.config.command_size;
        let buf = pad_command(command, command_size).map_err(|_| WriteError::CommandTooLong {
            length: command.len(),
            command_size,
        })?;
        Self::write_locked(session, &buf)
    }

    /// Body of a read. Caller holds the guard.
    fn read_locked(state: &mut LinkState, timeout: Option<Duration>) -> Result<RawFrame, ReadOutcome> {
        let LinkState {
            session,
            scratch,
            buffer,
        } = state;
        let session = session.as_mut().ok_or(ReadOutcome::NotOpen)?;
        let timeout = timeout.unwrap_or_else(|| session.config.read_timeout());

        match session.channel.read_within(&mut scratch[..], timeout) {
            Ok(None) | Ok(Some(0)) => {
                metrics::counter!(metric_defs::LINK_READ_NO_DATA.name, &session.labels.to_labels())
                    .increment(1);
                Err(ReadOutcome::NoData)
            }
            Ok(Some(n)) => {
                let n = n.min(scratch.len());
                buffer.store(&scratch[..n]);
                metrics::counter!(metric_defs::LINK_BYTES_READ.name, &session.labels.to_labels())
                    .increment(n as u64);
                trace!(device = %session.labels.device, bytes = n, "read");
                Ok(buffer.snapshot())
            }
            Err(e) => {
                warn!(device = %session.labels.device, "read failed: {}", e);
                metrics::counter!(
                    metric_defs::LINK_IO_ERRORS.name,
                    &session.labels.with(&[("op", "read".to_string())])
                )
                .increment(1);
                Err(ReadOutcome::IoFailure(e))
            }
        }
    }

    /// Body of a write. Caller holds the guard.
    fn write_locked(session: &mut Session, bytes: &[u8]) -> Result<usize, WriteError> {
        let io_failure = |op: &'static str, e: io::Error, labels: &LinkLabels| {
            warn!(device = %labels.device, "{} failed: {}", op, e);
            metrics::counter!(
                metric_defs::LINK_IO_ERRORS.name,
                &labels.with(&[("op", op.to_string())])
            )
            .increment(1);
            WriteError::IoFailure(e)
        };

        let written = session
            .channel
            .write(bytes)
            .map_err(|e| io_failure("write", e, &session.labels))?;
        session
            .channel
            .drain()
            .map_err(|e| io_failure("drain", e, &session.labels))?;

        if written < bytes.len() {
            debug!(device = %session.labels.device, "partial write: {} of {} bytes", written, bytes.len());
        }
        metrics::counter!(metric_defs::LINK_BYTES_WRITTEN.name, &session.labels.to_labels())
            .increment(written as u64);
        Ok(written)
    }
}
