//! Link configuration.
//!
//! A [`LinkConfig`] describes one session: which device to open and how to
//! configure it. It can be built in code or loaded from YAML:
//!
//! ```yaml
//! device: /dev/ttyUSB0
//! baud_rate: 115200
//! read_timeout_ms: 10
//! ```
//!
//! Only `device` is required; everything else falls back to 8N1 at
//! 115200 baud without flow control.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use gimbal_protocol::{DEFAULT_COMMAND_SIZE, DEFAULT_READ_TIMEOUT_MS};
use serde::Deserialize;

use crate::error::{ConfigError, OpenError};

// ============================================================================
// Baud Rate
// ============================================================================

/// Baud rates the controller link supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    B1200,
    B1800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B460800,
    B921600,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 9] = [
        BaudRate::B1200,
        BaudRate::B1800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B460800,
        BaudRate::B921600,
    ];

    /// Rate in bits per second.
    pub const fn as_u32(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B1800 => 1800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
            BaudRate::B460800 => 460800,
            BaudRate::B921600 => 921600,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = OpenError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|b| b.as_u32() == rate)
            .ok_or(OpenError::UnsupportedBaudRate(rate))
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

// ============================================================================
// Link Configuration
// ============================================================================

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    BaudRate::B115200.as_u32()
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_command_size() -> usize {
    DEFAULT_COMMAND_SIZE
}

/// Parameters of one link session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub device: String,
    /// Requested baud rate. Must be one of [`BaudRate::ALL`].
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Data bits per character. The controller uses 8.
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits. The controller uses 1.
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Even parity when set. The controller uses none.
    #[serde(default)]
    pub parity: bool,
    /// RTS/CTS flow control when set. The controller uses none.
    #[serde(default)]
    pub hardware_flow_control: bool,
    /// How long a default read waits for input.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Number of bytes every command write sends.
    #[serde(default = "default_command_size")]
    pub command_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            device: default_device(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: false,
            hardware_flow_control: false,
            read_timeout_ms: default_read_timeout_ms(),
            command_size: default_command_size(),
        }
    }
}

impl LinkConfig {
    /// Create an 8N1 configuration for `device` at `baud_rate`.
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        LinkConfig {
            device: device.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the default read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the fixed command size.
    pub fn with_command_size(mut self, size: usize) -> Self {
        self.command_size = size;
        self
    }

    /// Default read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_rates_round_trip() {
        for rate in BaudRate::ALL {
            assert_eq!(BaudRate::try_from(rate.as_u32()), Ok(rate));
        }
    }

    #[test]
    fn test_unsupported_rates() {
        for rate in [0, 300, 2400, 4800, 14400, 115201, 230400, 1_000_000] {
            assert_eq!(BaudRate::try_from(rate), Err(OpenError::UnsupportedBaudRate(rate)));
        }
    }

    #[test]
    fn test_default_config_is_8n1() {
        let config = LinkConfig::default();
        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.stop_bits, 1);
        assert!(!config.parity);
        assert!(!config.hardware_flow_control);
        assert_eq!(config.read_timeout(), Duration::from_millis(10));
        assert_eq!(config.command_size, DEFAULT_COMMAND_SIZE);
    }

    #[test]
    fn test_read_timeout_saturates() {
        let config = LinkConfig::default().with_read_timeout(Duration::MAX);
        assert_eq!(config.read_timeout_ms, u64::MAX);

        let config = LinkConfig::default().with_read_timeout(Duration::from_micros(2500));
        assert_eq!(config.read_timeout_ms, 2);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = LinkConfig::from_yaml_str("device: /dev/ttyACM0\n").expect("should parse");
        assert_eq!(config, LinkConfig::new("/dev/ttyACM0", 115200));
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
device: /dev/ttyS1
baud_rate: 57600
read_timeout_ms: 50
command_size: 12
"#;
        let config = LinkConfig::from_yaml_str(yaml).expect("should parse");
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.read_timeout(), Duration::from_millis(50));
        assert_eq!(config.command_size, 12);
    }

    #[test]
    fn test_yaml_requires_device() {
        assert!(matches!(
            LinkConfig::from_yaml_str("baud_rate: 9600\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
