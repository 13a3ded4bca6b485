//! Error types for the serial link.

use std::io;

use thiserror::Error;

/// Errors that abort an open attempt.
///
/// The link stays closed after any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    /// The device could not be opened.
    #[error("could not open {device}: {reason}")]
    DeviceUnavailable {
        /// Device path.
        device: String,
        /// Reason reported by the system.
        reason: String,
    },

    /// The opened handle is not a serial-capable device.
    #[error("{device} is not a serial port")]
    NotATerminal {
        /// Device path.
        device: String,
    },

    /// The baud rate is not in the supported set.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The driver refused the requested settings.
    #[error("could not configure {device}: {reason}")]
    ConfigurationRejected {
        /// Device path.
        device: String,
        /// Reason reported by the driver.
        reason: String,
    },

    /// The link already holds an open channel.
    #[error("link to {device} is already open")]
    AlreadyOpen {
        /// Device path of the open session.
        device: String,
    },
}

impl OpenError {
    /// Short label, suitable for metric labels.
    pub const fn reason(&self) -> &'static str {
        match self {
            OpenError::DeviceUnavailable { .. } => "device_unavailable",
            OpenError::NotATerminal { .. } => "not_a_terminal",
            OpenError::UnsupportedBaudRate(_) => "unsupported_baud_rate",
            OpenError::ConfigurationRejected { .. } => "configuration_rejected",
            OpenError::AlreadyOpen { .. } => "already_open",
        }
    }
}

/// Why a read did not produce a frame.
#[derive(Debug, Error)]
pub enum ReadOutcome {
    /// Nothing became readable within the timeout. Expected under polling.
    #[error("no data available")]
    NoData,

    /// The link is closed.
    #[error("link is not open")]
    NotOpen,

    /// The read call itself failed.
    #[error("read failed: {0}")]
    IoFailure(#[source] io::Error),
}

impl ReadOutcome {
    /// True for [`ReadOutcome::NoData`].
    pub fn is_no_data(&self) -> bool {
        matches!(self, ReadOutcome::NoData)
    }
}

/// Errors returned by writes.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The write or the following drain failed.
    #[error("write failed: {0}")]
    IoFailure(#[source] io::Error),

    /// The link is closed.
    #[error("link is not open")]
    NotOpen,

    /// The requested length exceeds the supplied buffer.
    #[error("write length {length} exceeds buffer of {available} bytes")]
    LengthOutOfRange {
        /// Requested length.
        length: usize,
        /// Bytes available in the buffer.
        available: usize,
    },

    /// The command does not fit the fixed command size.
    #[error("command of {length} bytes exceeds fixed command size {command_size}")]
    CommandTooLong {
        /// Length of the command.
        length: usize,
        /// Configured command size.
        command_size: usize,
    },
}

/// Errors loading a link configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parse error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
