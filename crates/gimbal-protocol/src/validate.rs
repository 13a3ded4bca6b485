//! Frame validation.
//!
//! Classifies the bytes returned by a single read as one well formed frame or
//! as one specific defect. The checks run in a fixed order:
//!
//! 1. start marker, which short-circuits everything else
//! 2. header checksum
//! 3. body length consistency
//!
//! When both checksums fail the header defect is reported, since the body
//! check relies on the size byte the header vouches for.

use crate::constants::*;

/// Result of validating a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationResult {
    /// All checks passed.
    Valid,
    /// `(cmd_id + size) mod 256` does not match the header checksum byte.
    BadHeaderChecksum,
    /// Declared size plus header length does not match the bytes received.
    BadBodyChecksum,
    /// First byte is not the start marker.
    MalformedFrame,
}

impl ValidationResult {
    /// Returns true for [`ValidationResult::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Diagnostic code used by the controller tooling.
    ///
    /// Positive for a valid frame, negative and distinct for each defect.
    pub const fn code(&self) -> i8 {
        match self {
            ValidationResult::Valid => 1,
            ValidationResult::BadHeaderChecksum => -1,
            ValidationResult::BadBodyChecksum => -2,
            ValidationResult::MalformedFrame => -3,
        }
    }

    /// Short label, suitable for metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ValidationResult::Valid => "valid",
            ValidationResult::BadHeaderChecksum => "bad_header_checksum",
            ValidationResult::BadBodyChecksum => "bad_body_checksum",
            ValidationResult::MalformedFrame => "malformed_frame",
        }
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationResult::Valid => write!(f, "valid frame"),
            ValidationResult::BadHeaderChecksum => write!(f, "the header checksum was incorrect"),
            ValidationResult::BadBodyChecksum => write!(f, "the body checksum was incorrect"),
            ValidationResult::MalformedFrame => {
                write!(f, "the received data was not in the correct format")
            }
        }
    }
}

/// Compute the header checksum for a command id and declared payload size.
pub const fn header_checksum(command_id: u8, data_size: u8) -> u8 {
    command_id.wrapping_add(data_size)
}

/// Check that the declared payload size agrees with the bytes received.
pub fn body_length_matches(data_size: u8, bytes_read: usize) -> bool {
    data_size as usize + HEADER_LEN == bytes_read
}

/// Byte at `index`, or zero past the end of `raw`.
///
/// The receive buffer is zero filled beyond the bytes of the last read, so a
/// short slice behaves the same as that buffer.
fn byte_at(raw: &[u8], index: usize) -> u8 {
    raw.get(index).copied().unwrap_or(0)
}

/// Validate the bytes of one read.
///
/// `raw` holds the received bytes (typically the receive buffer) and
/// `bytes_read` is the count the read call reported, which may exceed
/// `raw.len()` when the read was longer than the buffer.
pub fn validate(raw: &[u8], bytes_read: usize) -> ValidationResult {
    if byte_at(raw, 0) != START_MARKER {
        log::trace!("frame rejected: first byte 0x{:02X} is not the start marker", byte_at(raw, 0));
        return ValidationResult::MalformedFrame;
    }

    let command_id = byte_at(raw, OFFSET_COMMAND_ID);
    let data_size = byte_at(raw, OFFSET_DATA_SIZE);
    let header_ok = header_checksum(command_id, data_size) == byte_at(raw, OFFSET_HEADER_CHECKSUM);
    let body_ok = body_length_matches(data_size, bytes_read);

    if !header_ok {
        log::trace!(
            "frame rejected: header checksum 0x{:02X} != 0x{:02X}",
            byte_at(raw, OFFSET_HEADER_CHECKSUM),
            header_checksum(command_id, data_size)
        );
        return ValidationResult::BadHeaderChecksum;
    }
    if !body_ok {
        log::trace!(
            "frame rejected: declared size {} + {} != {} bytes read",
            data_size,
            HEADER_LEN,
            bytes_read
        );
        return ValidationResult::BadBodyChecksum;
    }

    ValidationResult::Valid
}
