//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use gimbal_link::LinkConfig;
use gimbal_protocol::encode_command;

use crate::error::RunnerError;
use crate::monitor::{MonitorOptions, DEFAULT_MAX_IO_ERRORS};

/// Talk to a gimbal controller over its serial link.
#[derive(Debug, Parser)]
#[command(name = "gimbal", version, about)]
pub struct Args {
    /// Serial device path (overrides the config file).
    #[arg(short, long)]
    pub device: Option<String>,

    /// Baud rate (overrides the config file).
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// YAML link configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Read timeout in milliseconds (overrides the config file).
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Fixed size of every command write (overrides the config file).
    #[arg(long, value_name = "BYTES")]
    pub command_size: Option<usize>,

    /// Command to send before polling, as CMD or CMD:PAYLOAD in hex. Repeatable.
    #[arg(long = "command", value_name = "CMD[:PAYLOAD]")]
    pub commands: Vec<String>,

    /// Pre-encoded frame to send before polling, in hex. Repeatable.
    #[arg(long = "raw", value_name = "HEX")]
    pub raw: Vec<String>,

    /// Stop after this many valid frames.
    #[arg(long, value_name = "N")]
    pub frames: Option<usize>,

    /// Stop after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Give up after this many read failures in a row.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_IO_ERRORS)]
    pub max_io_errors: usize,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the link configuration: file (or defaults) first, then flags.
    pub fn link_config(&self) -> Result<LinkConfig, RunnerError> {
        let mut config = match &self.config {
            Some(path) => LinkConfig::load(path)?,
            None => LinkConfig::default(),
        };
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_read_timeout(Duration::from_millis(ms));
        }
        if let Some(size) = self.command_size {
            config = config.with_command_size(size);
        }
        Ok(config)
    }

    /// Encoded frames to send, `--command` entries first, then `--raw`.
    pub fn outgoing_frames(&self) -> Result<Vec<Vec<u8>>, RunnerError> {
        let mut frames = Vec::with_capacity(self.commands.len() + self.raw.len());
        for spec in &self.commands {
            let (command_id, payload) = parse_command_spec(spec)?;
            frames.push(encode_command(command_id, &payload)?);
        }
        for raw in &self.raw {
            frames.push(decode_hex(raw)?);
        }
        Ok(frames)
    }

    /// Stop conditions for the monitor.
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            max_valid_frames: self.frames,
            max_duration: self.duration.map(Duration::from_secs),
            max_consecutive_io_errors: self.max_io_errors,
        }
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, RunnerError> {
    let cleaned: String = s
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&cleaned).map_err(|e| RunnerError::InvalidArgument(format!("bad hex '{}': {}", s, e)))
}

/// Parse `CMD` or `CMD:PAYLOAD`, both in hex.
pub fn parse_command_spec(spec: &str) -> Result<(u8, Vec<u8>), RunnerError> {
    let (command, payload) = match spec.split_once(':') {
        Some((command, payload)) => (command, decode_hex(payload)?),
        None => (spec, Vec::new()),
    };
    let command_id = u8::from_str_radix(command.trim_start_matches("0x"), 16)
        .map_err(|e| RunnerError::InvalidArgument(format!("bad command id '{}': {}", command, e)))?;
    Ok((command_id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_spec() {
        assert_eq!(parse_command_spec("56").unwrap(), (0x56, vec![]));
        assert_eq!(parse_command_spec("0x43:0102").unwrap(), (0x43, vec![1, 2]));
        assert!(parse_command_spec("zz").is_err());
        assert!(parse_command_spec("43:0").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "gimbal", "--device", "/dev/ttyACM1", "--baud", "9600", "--timeout-ms", "25",
        ])
        .expect("should parse");
        let config = args.link_config().expect("config");
        assert_eq!(config.device, "/dev/ttyACM1");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout(), Duration::from_millis(25));
        assert_eq!(config.data_bits, 8);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("link.yaml");
        std::fs::write(&path, "device: /dev/ttyS3\nbaud_rate: 57600\ncommand_size: 10\n").expect("write");

        let args = Args::try_parse_from([
            "gimbal",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--baud",
            "38400",
        ])
        .expect("should parse");
        let config = args.link_config().expect("config");
        assert_eq!(config.device, "/dev/ttyS3");
        assert_eq!(config.baud_rate, 38400);
        assert_eq!(config.command_size, 10);
    }

    #[test]
    fn test_outgoing_frames() {
        let args = Args::try_parse_from(["gimbal", "--command", "56", "--raw", "3E 43 00 43 00"])
            .expect("should parse");
        let frames = args.outgoing_frames().expect("frames");
        assert_eq!(frames, vec![vec![0x3E, 0x56, 0x00, 0x56, 0x00], vec![0x3E, 0x43, 0x00, 0x43, 0x00]]);
    }

    #[test]
    fn test_verbosity_and_stop_conditions() {
        let args = Args::try_parse_from(["gimbal", "-vv", "--frames", "3", "--duration", "2"])
            .expect("should parse");
        assert_eq!(args.verbose, 2);
        let options = args.monitor_options();
        assert_eq!(options.max_valid_frames, Some(3));
        assert_eq!(options.max_duration, Some(Duration::from_secs(2)));
        assert_eq!(options.max_consecutive_io_errors, DEFAULT_MAX_IO_ERRORS);

        let args = Args::try_parse_from(["gimbal", "--max-io-errors", "3"]).expect("should parse");
        assert_eq!(args.monitor_options().max_consecutive_io_errors, 3);
    }
}
