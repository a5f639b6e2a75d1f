//! Command codes
//!
//! The desk and the handset share one code space, and a few codes mean
//! different things depending on who sent them (`0x21` is "report max height"
//! from the desk but "set max height" from the handset). [`Command::from_code`]
//! uses the frame's address to tell them apart.

use crate::frame::Address;

/// Commands sent by the desk controller
pub mod desk {
    /// Height report ([P0, P1] = height, P2 unused, always 0x0F)
    pub const HEIGHT: u8 = 0x01;
    /// Max-height set/cleared; response to `handset::SET_MAX`
    pub const LIMIT_RESPONSE: u8 = 0x20;
    /// Report max height ([P0, P1] = max height)
    pub const GET_MAX: u8 = 0x21;
    /// Report min height ([P0, P1] = min height)
    pub const GET_MIN: u8 = 0x22;
    /// Min/max reached (0x01 max, 0x02 min)
    pub const LIMIT_STOP: u8 = 0x23;
    /// Desk is in RESET mode
    pub const RESET: u8 = 0x40;
    /// Moving to preset (0x04, 0x08, 0x10, 0x20 for presets 1-4)
    pub const PRESET: u8 = 0x92;
}

/// Commands sent by the handset
pub mod handset {
    /// Program memory position 1 to current height
    pub const PROG_MEM_1: u8 = 0x03;
    /// Program memory position 2 to current height
    pub const PROG_MEM_2: u8 = 0x04;
    /// Program memory position 3 to current height
    pub const PROG_MEM_3: u8 = 0x25;
    /// Program memory position 4 to current height
    pub const PROG_MEM_4: u8 = 0x26;
    /// Set units (0x00 cm, 0x01 inches)
    pub const UNITS: u8 = 0x0E;
    /// Set memory mode (0x00 one-touch, 0x01 constant touch)
    pub const MEM_MODE: u8 = 0x19;
    /// Set anti-collision sensitivity (1/2/3 high/medium/low)
    pub const COLLISION_SENSITIVITY: u8 = 0x1D;
    /// Set max height to current height
    pub const SET_MAX: u8 = 0x21;
    /// Set min height to current height
    pub const SET_MIN: u8 = 0x22;
    /// Clear min/max height (0x01 max, 0x02 min)
    pub const LIMIT_CLEAR: u8 = 0x23;
    /// Poll sent when the desk doesn't respond to BREAK
    pub const WAKE: u8 = 0x29;
    /// Height calibration; desk must be at its lowest position
    pub const CALIBRATE: u8 = 0x91;
}

/// Typed view of a frame's command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Desk
    Height,
    LimitResponse,
    GetMax,
    GetMin,
    LimitStop,
    Reset,
    Preset,

    // Handset
    /// Program memory slot (1-4)
    ProgramMemory(u8),
    SetUnits,
    SetMemoryMode,
    SetCollisionSensitivity,
    SetMax,
    SetMin,
    LimitClear,
    Wake,
    Calibrate,

    /// Code not in the catalogue for this sender
    Unknown(u8),
}

impl Command {
    /// Resolve a command code sent from the given address
    pub fn from_code(address: Address, code: u8) -> Self {
        match address {
            Address::Desk => match code {
                desk::HEIGHT => Self::Height,
                desk::LIMIT_RESPONSE => Self::LimitResponse,
                desk::GET_MAX => Self::GetMax,
                desk::GET_MIN => Self::GetMin,
                desk::LIMIT_STOP => Self::LimitStop,
                desk::RESET => Self::Reset,
                desk::PRESET => Self::Preset,
                _ => Self::Unknown(code),
            },
            Address::Handset => match code {
                handset::PROG_MEM_1 => Self::ProgramMemory(1),
                handset::PROG_MEM_2 => Self::ProgramMemory(2),
                handset::PROG_MEM_3 => Self::ProgramMemory(3),
                handset::PROG_MEM_4 => Self::ProgramMemory(4),
                handset::UNITS => Self::SetUnits,
                handset::MEM_MODE => Self::SetMemoryMode,
                handset::COLLISION_SENSITIVITY => Self::SetCollisionSensitivity,
                handset::SET_MAX => Self::SetMax,
                handset::SET_MIN => Self::SetMin,
                handset::LIMIT_CLEAR => Self::LimitClear,
                handset::WAKE => Self::Wake,
                handset::CALIBRATE => Self::Calibrate,
                _ => Self::Unknown(code),
            },
        }
    }

    /// Wire code for this command
    pub fn code(&self) -> u8 {
        match self {
            Self::Height => desk::HEIGHT,
            Self::LimitResponse => desk::LIMIT_RESPONSE,
            Self::GetMax => desk::GET_MAX,
            Self::GetMin => desk::GET_MIN,
            Self::LimitStop => desk::LIMIT_STOP,
            Self::Reset => desk::RESET,
            Self::Preset => desk::PRESET,
            Self::ProgramMemory(2) => handset::PROG_MEM_2,
            Self::ProgramMemory(3) => handset::PROG_MEM_3,
            Self::ProgramMemory(4) => handset::PROG_MEM_4,
            Self::ProgramMemory(_) => handset::PROG_MEM_1,
            Self::SetUnits => handset::UNITS,
            Self::SetMemoryMode => handset::MEM_MODE,
            Self::SetCollisionSensitivity => handset::COLLISION_SENSITIVITY,
            Self::SetMax => handset::SET_MAX,
            Self::SetMin => handset::SET_MIN,
            Self::LimitClear => handset::LIMIT_CLEAR,
            Self::Wake => handset::WAKE,
            Self::Calibrate => handset::CALIBRATE,
            Self::Unknown(code) => *code,
        }
    }

    /// Short name for logs; empty for unknown codes
    pub fn name(&self) -> &'static str {
        match self {
            Self::Height => "HEIGHT",
            Self::LimitResponse => "LIMIT_RESP",
            Self::GetMax => "GET_MAX",
            Self::GetMin => "GET_MIN",
            Self::LimitStop => "LIMIT_STOP",
            Self::Reset => "RESET",
            Self::Preset => "PRESET",
            Self::ProgramMemory(_) => "PROG_MEM",
            Self::SetUnits => "UNITS",
            Self::SetMemoryMode => "MEM_MODE",
            Self::SetCollisionSensitivity => "COLL_SENS",
            Self::SetMax => "SET_MAX",
            Self::SetMin => "SET_MIN",
            Self::LimitClear => "LIMIT_CLR",
            Self::Wake => "WAKE",
            Self::Calibrate => "CALIBRATE",
            Self::Unknown(_) => "",
        }
    }

    /// Returns true if the code is in the catalogue
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}
