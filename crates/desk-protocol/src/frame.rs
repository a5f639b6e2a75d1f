//! Frame data model and wire encoding

use crate::checksum;
use crate::error::FrameError;

/// Address byte sent by the handset
pub const ADDRESS_HANDSET: u8 = 0xF1;
/// Address byte sent by the desk controller
pub const ADDRESS_DESK: u8 = 0xF2;
/// Frame terminator byte
pub const TERMINATOR: u8 = 0x7E;
/// Maximum number of parameter bytes in a frame
pub const MAX_PARAM_LEN: u8 = 3;

/// Bytes in a frame besides its parameters: 2 address, command, length,
/// checksum and terminator
pub const FRAME_OVERHEAD: usize = 6;

/// Sender of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Handset (0xF1)
    Handset,
    /// Desk controller (0xF2)
    Desk,
}

impl Address {
    /// Map a wire byte to an address, if it is one of the two sentinels
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ADDRESS_HANDSET => Some(Self::Handset),
            ADDRESS_DESK => Some(Self::Desk),
            _ => None,
        }
    }

    /// Wire byte for this address
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Handset => ADDRESS_HANDSET,
            Self::Desk => ADDRESS_DESK,
        }
    }
}

impl TryFrom<u8> for Address {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(FrameError::InvalidAddress(value))
    }
}

/// A complete, terminated frame
///
/// Frames are immutable once built. `raw` holds the exact bytes the frame was
/// decoded from (or encoded to), which is always
/// `FRAME_OVERHEAD + param_length` bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Vec<u8>,
    address: Address,
    command: u8,
    param_length: u8,
    params: u32,
    checksum: u8,
    checksum_valid: bool,
}

impl Frame {
    /// Build a frame with a correct checksum
    pub fn new(address: Address, command: u8, params: &[u8]) -> Result<Self, FrameError> {
        let (param_length, value) = pack_params(params)?;
        let cksum = checksum::compute(command, param_length, value);
        Ok(Self::from_parts(address, command, param_length, value, cksum))
    }

    /// Build a frame carrying an arbitrary checksum byte
    pub fn with_checksum(
        address: Address,
        command: u8,
        params: &[u8],
        checksum: u8,
    ) -> Result<Self, FrameError> {
        let (param_length, value) = pack_params(params)?;
        Ok(Self::from_parts(address, command, param_length, value, checksum))
    }

    fn from_parts(address: Address, command: u8, param_length: u8, params: u32, cksum: u8) -> Self {
        let mut raw = Vec::with_capacity(FRAME_OVERHEAD + usize::from(param_length));
        raw.extend_from_slice(&[address.as_byte(), address.as_byte(), command, param_length]);
        for position in (0..param_length).rev() {
            raw.push((params >> (8 * u32::from(position))) as u8);
        }
        raw.extend_from_slice(&[cksum, TERMINATOR]);

        Self::decoded(raw, address, command, param_length, params, cksum)
    }

    /// Assemble a frame from fields already read off the wire
    pub(crate) fn decoded(
        raw: Vec<u8>,
        address: Address,
        command: u8,
        param_length: u8,
        params: u32,
        checksum: u8,
    ) -> Self {
        let mut frame = Self {
            raw,
            address,
            command,
            param_length,
            params,
            checksum,
            checksum_valid: false,
        };
        frame.checksum_valid = checksum::verify(&frame);
        frame
    }

    /// Exact bytes of this frame, both address bytes through the terminator
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Wire encoding of this frame
    pub fn encode(&self) -> Vec<u8> {
        self.raw.clone()
    }

    /// Sender of this frame
    pub fn address(&self) -> Address {
        self.address
    }

    /// Raw command code
    pub fn command(&self) -> u8 {
        self.command
    }

    /// Declared number of parameter bytes (0-3)
    pub fn param_length(&self) -> u8 {
        self.param_length
    }

    /// Parameter bytes assembled big-endian
    pub fn params(&self) -> u32 {
        self.params
    }

    /// Checksum byte as received
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Whether the received checksum matched the frame's fields
    pub fn checksum_valid(&self) -> bool {
        self.checksum_valid
    }
}

fn pack_params(params: &[u8]) -> Result<(u8, u32), FrameError> {
    if params.len() > usize::from(MAX_PARAM_LEN) {
        return Err(FrameError::ParamsTooLong(params.len()));
    }

    let value = params
        .iter()
        .fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte));

    Ok((params.len() as u8, value))
}
