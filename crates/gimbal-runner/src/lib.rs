//! Runner for the gimbal serial link.
//!
//! Everything around the link handler that a process needs: argument parsing,
//! logging setup, a polling monitor and the Ctrl-C wiring that stops the
//! monitor before the link is closed.

pub mod cli;
pub mod error;
pub mod logging;
pub mod monitor;

pub use error::RunnerError;
