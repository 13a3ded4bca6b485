//! Serial port backend built on the `serialport` crate.
//!
//! The port is opened read/write, without becoming the controlling terminal
//! and without blocking on carrier detect, then switched to raw mode: no
//! input or output translation, no canonical mode, echo or signal
//! characters. Reads wait for readiness with the per-call timeout and then
//! perform a single read; writes are followed by a drain.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, ErrorKind, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace};

use crate::channel::{Channel, Connector};
use crate::config::{BaudRate, LinkConfig};
use crate::error::OpenError;

/// Convert a data bits count to serialport's DataBits.
fn to_serialport_data_bits(bits: u8) -> Option<DataBits> {
    match bits {
        5 => Some(DataBits::Five),
        6 => Some(DataBits::Six),
        7 => Some(DataBits::Seven),
        8 => Some(DataBits::Eight),
        _ => None,
    }
}

/// Convert a stop bits count to serialport's StopBits.
fn to_serialport_stop_bits(bits: u8) -> Option<StopBits> {
    match bits {
        1 => Some(StopBits::One),
        2 => Some(StopBits::Two),
        _ => None,
    }
}

/// Check that `device` exists and is a character device.
///
/// Whether the character device is a tty is only known once serialport
/// tries to configure it; see [`map_open_error`].
#[cfg(unix)]
fn check_device(device: &str) -> Result<(), OpenError> {
    use std::os::unix::fs::FileTypeExt;

    let metadata = std::fs::metadata(device).map_err(|e| OpenError::DeviceUnavailable {
        device: device.to_string(),
        reason: e.to_string(),
    })?;
    if !metadata.file_type().is_char_device() {
        return Err(OpenError::NotATerminal {
            device: device.to_string(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_device(_device: &str) -> Result<(), OpenError> {
    Ok(())
}

/// Whether `device` refers to a terminal.
///
/// Unknown (device cannot be reopened) counts as a terminal.
#[cfg(unix)]
fn is_terminal(device: &str) -> bool {
    use std::io::IsTerminal;

    std::fs::File::open(device).map_or(true, |file| file.is_terminal())
}

#[cfg(not(unix))]
fn is_terminal(_device: &str) -> bool {
    true
}

/// Classify an error from `serialport` once the device is known to exist.
///
/// serialport applies terminal settings straight after opening, so a
/// character device that is not a tty (e.g. `/dev/null`) fails there with
/// ENOTTY. That case is reported as `NotATerminal`.
fn map_open_error(device: &str, err: serialport::Error) -> OpenError {
    match err.kind() {
        ErrorKind::NoDevice
        | ErrorKind::Io(io::ErrorKind::NotFound)
        | ErrorKind::Io(io::ErrorKind::PermissionDenied) => OpenError::DeviceUnavailable {
            device: device.to_string(),
            reason: err.description,
        },
        _ if !is_terminal(device) => {
            debug!(device, "open failed on a non-terminal: {}", err.description);
            OpenError::NotATerminal {
                device: device.to_string(),
            }
        }
        _ => OpenError::ConfigurationRejected {
            device: device.to_string(),
            reason: err.description,
        },
    }
}

/// Opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&self, config: &LinkConfig, baud_rate: BaudRate) -> Result<Box<dyn Channel>, OpenError> {
        let rejected = |reason: String| OpenError::ConfigurationRejected {
            device: config.device.clone(),
            reason,
        };
        let data_bits = to_serialport_data_bits(config.data_bits)
            .ok_or_else(|| rejected(format!("unsupported data bits {}", config.data_bits)))?;
        let stop_bits = to_serialport_stop_bits(config.stop_bits)
            .ok_or_else(|| rejected(format!("unsupported stop bits {}", config.stop_bits)))?;
        let parity = if config.parity { Parity::Even } else { Parity::None };
        let flow_control = if config.hardware_flow_control {
            FlowControl::Hardware
        } else {
            FlowControl::None
        };

        check_device(&config.device)?;

        let port = serialport::new(&config.device, baud_rate.as_u32())
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| map_open_error(&config.device, e))?;

        debug!(
            device = %config.device,
            baud = %baud_rate,
            "serial port configured ({}{}{})",
            config.data_bits,
            if config.parity { 'E' } else { 'N' },
            config.stop_bits
        );

        Ok(Box::new(SerialChannel { port }))
    }
}

/// A configured serial port.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl Channel for SerialChannel {
    fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.port.set_timeout(timeout)?;
        match self.port.read(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                trace!("no input within {:?}: {}", timeout, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.port.write(bytes)
    }

    fn drain(&mut self) -> io::Result<()> {
        // flush() waits for the output queue to empty (tcdrain on unix)
        self.port.flush()
    }

    fn release(self: Box<Self>) -> io::Result<()> {
        // serialport closes the descriptor on drop and does not report errors
        drop(self.port);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bits_conversion() {
        assert_eq!(to_serialport_data_bits(8), Some(DataBits::Eight));
        assert_eq!(to_serialport_data_bits(5), Some(DataBits::Five));
        assert_eq!(to_serialport_data_bits(9), None);
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert_eq!(to_serialport_stop_bits(1), Some(StopBits::One));
        assert_eq!(to_serialport_stop_bits(2), Some(StopBits::Two));
        assert_eq!(to_serialport_stop_bits(0), None);
    }

    #[test]
    fn test_missing_device_is_unavailable() {
        let config = LinkConfig::new("/dev/this-port-does-not-exist", 115200);
        let err = SerialConnector
            .connect(&config, BaudRate::B115200)
            .err()
            .expect("open should fail");
        assert!(matches!(err, OpenError::DeviceUnavailable { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_regular_file_is_not_a_terminal() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let device = file.path().to_string_lossy().to_string();
        let config = LinkConfig::new(device.clone(), 115200);
        let err = SerialConnector
            .connect(&config, BaudRate::B115200)
            .err()
            .expect("open should fail");
        assert_eq!(err, OpenError::NotATerminal { device });
    }

    #[cfg(unix)]
    #[test]
    fn test_char_device_without_tty_is_not_a_terminal() {
        let config = LinkConfig::new("/dev/null", 115200);
        let err = SerialConnector
            .connect(&config, BaudRate::B115200)
            .err()
            .expect("open should fail");
        assert_eq!(
            err,
            OpenError::NotATerminal {
                device: "/dev/null".to_string()
            }
        );
    }

    #[test]
    fn test_bad_data_bits_rejected() {
        let mut config = LinkConfig::new("/dev/this-port-does-not-exist", 115200);
        config.data_bits = 9;
        let err = SerialConnector
            .connect(&config, BaudRate::B115200)
            .err()
            .expect("open should fail");
        assert!(matches!(err, OpenError::ConfigurationRejected { .. }), "{err:?}");
    }
}
