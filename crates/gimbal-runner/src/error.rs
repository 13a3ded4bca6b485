//! Error types for the runner.

use std::io;

use gimbal_link::{ConfigError, OpenError, WriteError};
use gimbal_protocol::ProtocolError;
use thiserror::Error;

/// Errors that end a runner session.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration file could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The link could not be opened.
    #[error("open failed: {0}")]
    Open(#[from] OpenError),

    /// A command could not be written.
    #[error("write failed: {0}")]
    Write(#[from] WriteError),

    /// A command could not be encoded.
    #[error("encoding failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// A command line value could not be parsed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The Ctrl-C handler could not be installed.
    #[error("signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Reads kept failing.
    #[error("giving up after {count} consecutive read failures: {source}")]
    ReadFailures {
        /// Failures in a row.
        count: usize,
        /// The last read error.
        #[source]
        source: io::Error,
    },

    /// The link was closed underneath the monitor.
    #[error("link closed while monitoring")]
    LinkClosed,
}
