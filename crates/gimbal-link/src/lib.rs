//! Serial link handler for a motorized gimbal controller.
//!
//! This crate owns the single byte channel to the controller. It opens and
//! configures the device, serializes concurrent reads and writes, and keeps
//! the most recently read frame in a fixed-size receive buffer. Frame
//! validation itself lives in [`gimbal_protocol`].
//!
//! # Example
//!
//! ```rust,no_run
//! use gimbal_link::{LinkConfig, ReadOutcome, SerialLink};
//!
//! let link = SerialLink::new();
//! link.open(LinkConfig::new("/dev/ttyUSB0", 115200))?;
//!
//! match link.receive() {
//!     Ok(received) => println!("{:?}: {}", received.frame, received.result),
//!     Err(ReadOutcome::NoData) => {}
//!     Err(e) => eprintln!("{e}"),
//! }
//!
//! link.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod channel;
mod config;
mod error;
mod link;
mod memory;
mod serial;

pub use channel::*;
pub use config::*;
pub use error::*;
pub use link::*;
pub use memory::*;
pub use serial::*;

pub use gimbal_protocol::{Frame, ValidationResult};
