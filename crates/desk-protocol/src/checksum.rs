//! Frame checksum
//!
//! The checksum is informational only: some desks report wrong checksums at
//! certain heights, so a mismatch is counted but the frame is still delivered.

use crate::frame::Frame;

/// Modulus of the checksum sum
pub const CHECKSUM_MODULUS: u32 = 0xFF;

/// Compute the checksum for the given frame fields
pub fn compute(command: u8, param_length: u8, params: u32) -> u8 {
    let sum = u32::from(command) + u32::from(param_length) + params;
    (sum % CHECKSUM_MODULUS) as u8
}

/// Check a frame's received checksum against its fields
pub fn verify(frame: &Frame) -> bool {
    compute(frame.command(), frame.param_length(), frame.params()) == frame.checksum()
}
