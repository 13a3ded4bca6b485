//! The seam between the link and the byte channel underneath it.
//!
//! [`SerialLink`](crate::SerialLink) never touches a device directly. A
//! [`Connector`] opens and configures the device and hands back a boxed
//! [`Channel`]; the link owns that channel behind its access guard.

use std::io;
use std::time::Duration;

use crate::config::{BaudRate, LinkConfig};
use crate::error::OpenError;

/// An open, configured byte channel.
pub trait Channel: Send {
    /// Wait up to `timeout` for input, then perform one read into `buf`.
    ///
    /// Returns `Ok(None)` when nothing became readable in time or the
    /// readiness wait itself was interrupted.
    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;

    /// Perform one write. May write fewer bytes than given.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Block until all queued output has been transmitted.
    fn drain(&mut self) -> io::Result<()>;

    /// Release the underlying handle.
    fn release(self: Box<Self>) -> io::Result<()>;
}

/// Opens channels for a link.
pub trait Connector: Send + Sync {
    /// Open `config.device` and apply raw mode at `baud_rate`.
    fn connect(&self, config: &LinkConfig, baud_rate: BaudRate) -> Result<Box<dyn Channel>, OpenError>;
}
