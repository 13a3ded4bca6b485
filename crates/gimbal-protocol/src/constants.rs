//! Protocol constants
//!
//! Sizes and sentinel values shared by the frame validator, the command
//! encoder and the serial link.

/// First byte of every frame.
pub const START_MARKER: u8 = 0x3E;

/// Length of the frame header used by the body length check.
///
/// The controller counts the header as four bytes when relating the declared
/// payload size to the number of bytes it sent.
pub const HEADER_LEN: usize = 4;

/// Offset of the command id within a frame.
pub const OFFSET_COMMAND_ID: usize = 1;
/// Offset of the declared payload size within a frame.
pub const OFFSET_DATA_SIZE: usize = 2;
/// Offset of the header checksum within a frame.
pub const OFFSET_HEADER_CHECKSUM: usize = 3;
/// Offset of the first payload byte.
pub const OFFSET_PAYLOAD: usize = 4;

/// Largest payload a single-byte size field can declare.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Maximum number of bytes taken from the channel by a single read.
pub const RECEIVE_CHUNK_SIZE: usize = 100;

/// Capacity of the receive buffer holding the most recent frame.
pub const FRAME_BUFFER_SIZE: usize = 53;

/// Number of bytes every outgoing command write sends.
///
/// Seven bytes fit a header, a two byte payload and the body checksum.
/// Shorter commands are zero padded up to this size.
pub const DEFAULT_COMMAND_SIZE: usize = 7;

/// Default time a read waits for the channel to become readable, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10;
