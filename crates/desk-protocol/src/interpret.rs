//! Typed values and descriptive text derived from frames

use std::fmt;

use crate::command::{desk, Command};
use crate::frame::{Address, Frame};

/// Height reports at or below this raw value are in tenths of an inch
///
/// Desks set to imperial units report e.g. 291 for 29.1"; the lowest metric
/// report is well above this.
pub const INCH_THRESHOLD: u64 = 550;

/// Millimeters per inch, applied to tenth-of-inch values before truncation
const TENTH_INCH_TO_MM: f64 = 2.54;

/// Unit of a raw height report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightUnit {
    /// Tenths of an inch
    TenthInch,
    /// Millimeters
    Millimeter,
}

impl HeightUnit {
    /// Suffix used when rendering a raw height
    pub fn suffix(self) -> &'static str {
        match self {
            Self::TenthInch => "in",
            Self::Millimeter => "mm",
        }
    }
}

/// Raw height value from a height report and its inferred unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightReading {
    /// Value from the top two parameter bytes
    pub raw: u64,
    /// Unit inferred from [`INCH_THRESHOLD`]
    pub unit: HeightUnit,
}

impl HeightReading {
    /// Classify a raw height value
    pub fn from_raw(raw: u64) -> Self {
        let unit = if raw <= INCH_THRESHOLD {
            HeightUnit::TenthInch
        } else {
            HeightUnit::Millimeter
        };
        Self { raw, unit }
    }

    /// Height in whole millimeters (truncated)
    pub fn millimeters(&self) -> u64 {
        match self.unit {
            HeightUnit::TenthInch => (self.raw as f64 * TENTH_INCH_TO_MM) as u64,
            HeightUnit::Millimeter => self.raw,
        }
    }
}

impl Frame {
    /// Typed view of the command, resolved with the sender's address
    pub fn kind(&self) -> Command {
        Command::from_code(self.address(), self.command())
    }

    /// Raw height reading, for height reports only
    pub fn height_reading(&self) -> Option<HeightReading> {
        if self.command() != desk::HEIGHT {
            return None;
        }

        // The last parameter byte is a fixed 0x0F marker
        Some(HeightReading::from_raw(u64::from(self.params() >> 8)))
    }

    /// Height in millimeters, or 0 if this isn't a height report
    pub fn height_mm(&self) -> u64 {
        self.height_reading()
            .map(|reading| reading.millimeters())
            .unwrap_or(0)
    }

    /// 1-indexed preset the desk is moving to, or 0 if this isn't a preset
    /// frame
    ///
    /// Presets 1-4 are sent as 4/8/16/32 (bits 2, 3, 4 and 5). Shifting right
    /// by one and counting trailing zeros maps them onto 1-4.
    pub fn preset(&self) -> u8 {
        if self.command() != desk::PRESET {
            return 0;
        }

        ((self.params() as u8) >> 1).trailing_zeros() as u8
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address() == Address::Desk {
            f.write_str("from desk: ")?;
        }

        match self.command() {
            desk::HEIGHT => {
                if let Some(reading) = self.height_reading() {
                    write!(f, "height: {}{}", reading.raw, reading.unit.suffix())?;
                }
            }
            desk::PRESET => write!(f, "preset: {}", self.preset())?,
            desk::LIMIT_STOP => {
                let verb = match self.address() {
                    Address::Desk => "reached",
                    Address::Handset => "cleared",
                };
                match self.params() {
                    0x01 => write!(f, "Max-height {verb}")?,
                    0x02 => write!(f, "Min-height {verb}")?,
                    _ => f.write_str("invalid params for LIMIT_STOP")?,
                }
            }
            desk::RESET => f.write_str("reset!")?,
            _ => {}
        }

        Ok(())
    }
}
