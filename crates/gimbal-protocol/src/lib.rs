//! Gimbal Controller Serial Protocol
//!
//! This crate provides the framing rules for talking to a motorized gimbal
//! controller over a serial link. It does not interpret what a command byte
//! means; it only lays out outgoing frames and classifies incoming ones.
//!
//! # Frame Layout
//!
//! ```text
//! +------+--------+------+------------+-------------------+---------+
//! | 0x3E | cmd_id | size | header_chk | payload[0..size]  | trailer |
//! +------+--------+------+------------+-------------------+---------+
//! ```
//!
//! - `header_chk` is `(cmd_id + size) mod 256`
//! - the body check compares `size + HEADER_LEN` with the number of bytes
//!   actually received (a length-consistency check, not a content checksum)
//!
//! # Example
//!
//! ```rust
//! use gimbal_protocol::{validate, ValidationResult};
//!
//! let raw = [0x3E, 0x05, 0x02, 0x07, 0xAA, 0xBB];
//! assert_eq!(validate(&raw, raw.len()), ValidationResult::Valid);
//! ```

mod constants;
mod error;
mod frame;
mod validate;

pub use constants::*;
pub use error::*;
pub use frame::*;
pub use validate::*;
