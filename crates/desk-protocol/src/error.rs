//! Error types for desk protocol decoding and encoding

use thiserror::Error;

use crate::frame::MAX_PARAM_LEN;

/// Errors that end a decode attempt
///
/// Noise, lost synchronization and checksum mismatches never surface here;
/// the decoder resolves those by resynchronizing.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The underlying byte source failed
    #[error("read: {0}")]
    Read(#[from] std::io::Error),

    /// The byte source has no more data
    #[error("end of stream")]
    EndOfStream,

    /// The cancel token was set
    #[error("decode cancelled")]
    Cancelled,

    /// Too many length bytes above the maximum within one decode attempt
    #[error("too many invalid lengths ({0})")]
    TooManyInvalidLengths(u32),
}

impl DecodeError {
    /// Returns true if the error was caused by cancellation rather than the link
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DecodeError::Cancelled)
    }
}

/// Errors that can occur while building a frame for the wire
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// More parameter bytes than the length field allows
    #[error("parameter length {0} exceeds maximum of {max}", max = MAX_PARAM_LEN)]
    ParamsTooLong(usize),

    /// Address byte is neither the handset nor the desk sentinel
    #[error("invalid address: 0x{0:02X}")]
    InvalidAddress(u8),
}
