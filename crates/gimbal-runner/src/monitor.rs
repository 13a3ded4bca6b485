//! Polling monitor.
//!
//! Repeatedly receives from the link and tallies what arrives until a stop
//! condition is met or the stop flag is raised. The monitor is the only
//! caller of the link while it runs, so once it returns nothing is in flight
//! and the link can be closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use gimbal_link::{ReadOutcome, SerialLink, ValidationResult};
use tracing::{debug, info, warn};

use crate::error::RunnerError;

/// Consecutive read failures tolerated before the monitor gives up.
pub const DEFAULT_MAX_IO_ERRORS: usize = 10;

/// Shortest pause after a failed read.
const MIN_IO_BACKOFF: Duration = Duration::from_millis(1);

/// When the monitor stops on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Stop after this many valid frames.
    pub max_valid_frames: Option<usize>,
    /// Stop after this much wall time.
    pub max_duration: Option<Duration>,
    /// Fail after this many read errors in a row.
    pub max_consecutive_io_errors: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions {
            max_valid_frames: None,
            max_duration: None,
            max_consecutive_io_errors: DEFAULT_MAX_IO_ERRORS,
        }
    }
}

/// Tally of receive outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Receive attempts made.
    pub polls: usize,
    /// Polls where nothing arrived within the read timeout.
    pub no_data: usize,
    pub valid: usize,
    pub bad_header_checksum: usize,
    pub bad_body_checksum: usize,
    pub malformed: usize,
    /// Polls where the read itself failed.
    pub io_errors: usize,
}

impl MonitorStats {
    fn record(&mut self, result: ValidationResult) {
        match result {
            ValidationResult::Valid => self.valid += 1,
            ValidationResult::BadHeaderChecksum => self.bad_header_checksum += 1,
            ValidationResult::BadBodyChecksum => self.bad_body_checksum += 1,
            ValidationResult::MalformedFrame => self.malformed += 1,
        }
    }

    /// Frames that arrived but failed validation.
    pub fn rejected(&self) -> usize {
        self.bad_header_checksum + self.bad_body_checksum + self.malformed
    }
}

impl std::fmt::Display for MonitorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} polls, {} valid, {} rejected (header {}, body {}, malformed {}), {} empty, {} I/O errors",
            self.polls,
            self.valid,
            self.rejected(),
            self.bad_header_checksum,
            self.bad_body_checksum,
            self.malformed,
            self.no_data,
            self.io_errors
        )
    }
}

/// Write each frame as a fixed-size command.
pub fn send_commands(link: &SerialLink, frames: &[Vec<u8>]) -> Result<usize, RunnerError> {
    let mut total = 0;
    for frame in frames {
        let written = link.write_command(frame)?;
        info!("sent {} ({} bytes on the wire)", hex::encode(frame), written);
        total += written;
    }
    Ok(total)
}

/// Poll the link until `stop` is raised or an option's limit is reached.
///
/// A failed read is followed by a pause of one read timeout, so a dead
/// device is not polled in a tight loop. After
/// [`max_consecutive_io_errors`](MonitorOptions::max_consecutive_io_errors)
/// failures in a row the monitor returns [`RunnerError::ReadFailures`].
pub fn run_monitor(
    link: &SerialLink,
    stop: &AtomicBool,
    options: &MonitorOptions,
) -> Result<MonitorStats, RunnerError> {
    let started = Instant::now();
    let backoff = link
        .config()
        .map_or(MIN_IO_BACKOFF, |config| config.read_timeout())
        .max(MIN_IO_BACKOFF);
    let mut stats = MonitorStats::default();
    let mut consecutive_io_errors = 0;

    while !stop.load(Ordering::SeqCst) {
        if options.max_valid_frames.is_some_and(|max| stats.valid >= max) {
            break;
        }
        if options.max_duration.is_some_and(|max| started.elapsed() >= max) {
            break;
        }

        stats.polls += 1;
        match link.receive() {
            Ok(received) => {
                consecutive_io_errors = 0;
                stats.record(received.result);
                match received.frame.frame() {
                    Ok(frame) if frame.is_truncated() => warn!(
                        "frame cmd=0x{:02X} size={} truncated to {} payload bytes: {}",
                        frame.command_id,
                        frame.data_size,
                        frame.payload.len(),
                        hex::encode(frame.payload)
                    ),
                    Ok(frame) => info!(
                        "frame cmd=0x{:02X} size={} payload={}",
                        frame.command_id,
                        frame.data_size,
                        hex::encode(frame.payload)
                    ),
                    Err(defect) => warn!(
                        "{} ({} bytes: {})",
                        defect,
                        received.frame.bytes_read(),
                        hex::encode(received.frame.received())
                    ),
                }
            }
            Err(ReadOutcome::NoData) => {
                consecutive_io_errors = 0;
                stats.no_data += 1;
            }
            Err(ReadOutcome::NotOpen) => return Err(RunnerError::LinkClosed),
            Err(ReadOutcome::IoFailure(e)) => {
                stats.io_errors += 1;
                consecutive_io_errors += 1;
                if consecutive_io_errors >= options.max_consecutive_io_errors {
                    return Err(RunnerError::ReadFailures {
                        count: consecutive_io_errors,
                        source: e,
                    });
                }
                debug!("read failed ({} in a row): {}", consecutive_io_errors, e);
                thread::sleep(backoff);
            }
        }
    }

    Ok(stats)
}
