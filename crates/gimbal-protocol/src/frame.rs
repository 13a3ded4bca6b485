//! Frame view and command encoding.
//!
//! Incoming frames are never copied into an owned type: [`Frame`] borrows the
//! bytes of a validated read. Outgoing commands are laid out by
//! [`encode_command`] and padded to the fixed command size by
//! [`pad_command`].
//!
//! ```text
//! +------+--------+------+------------+-------------------+----------+
//! | 0x3E | cmd_id | size | header_chk | payload[0..size]  | body_chk |
//! +------+--------+------+------------+-------------------+----------+
//! ```

use bytes::BufMut;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::validate::{header_checksum, validate, ValidationResult};

/// A validated frame borrowed from a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Command id the controller answered with.
    pub command_id: u8,
    /// Declared payload size.
    pub data_size: u8,
    /// Header checksum byte as received.
    pub header_checksum: u8,
    /// Payload bytes available in the buffer.
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Validate `raw` and, if it holds a well formed frame, return a view of it.
    ///
    /// On failure the specific defect is returned.
    pub fn parse(raw: &'a [u8], bytes_read: usize) -> Result<Self, ValidationResult> {
        match validate(raw, bytes_read) {
            ValidationResult::Valid => {}
            defect => return Err(defect),
        }

        let data_size = raw.get(OFFSET_DATA_SIZE).copied().unwrap_or(0);
        let start = OFFSET_PAYLOAD.min(raw.len());
        let end = (OFFSET_PAYLOAD + data_size as usize).min(raw.len());

        Ok(Frame {
            command_id: raw.get(OFFSET_COMMAND_ID).copied().unwrap_or(0),
            data_size,
            header_checksum: raw.get(OFFSET_HEADER_CHECKSUM).copied().unwrap_or(0),
            payload: &raw[start..end],
        })
    }

    /// True when the buffer held fewer payload bytes than the frame declared.
    pub fn is_truncated(&self) -> bool {
        self.payload.len() < self.data_size as usize
    }
}

/// Modular byte sum used as the body checksum of outgoing commands.
pub fn payload_checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a command frame.
///
/// Format: `0x3E` + cmd_id + size + header_chk + payload + body_chk
pub fn encode_command(command_id: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLong {
            max: MAX_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let size = payload.len() as u8;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + 1);
    buf.put_u8(START_MARKER);
    buf.put_u8(command_id);
    buf.put_u8(size);
    buf.put_u8(header_checksum(command_id, size));
    buf.put_slice(payload);
    buf.put_u8(payload_checksum(payload));
    Ok(buf)
}

/// Zero-pad an encoded frame to exactly `command_size` bytes.
pub fn pad_command(frame: &[u8], command_size: usize) -> Result<Vec<u8>, ProtocolError> {
    if frame.len() > command_size {
        return Err(ProtocolError::CommandTooLong {
            max: command_size,
            actual: frame.len(),
        });
    }

    let mut buf = Vec::with_capacity(command_size);
    buf.put_slice(frame);
    buf.put_bytes(0, command_size - frame.len());
    Ok(buf)
}
