//! Register contents and structured replies read back from the supply.

use core::str::FromStr;

use modular_bitfield::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};

/// Regulation state reported by `MODE?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OperationMode {
    /// Constant voltage regulation.
    Cv,
    /// Constant current regulation.
    Cc,
    /// Output disabled.
    Off,
}

/// Baud rates the supply's serial interface supports.
///
/// Selecting one is the transport collaborator's job; the values are exported
/// so callers can configure their port from the same table the supply uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
}

impl From<BaudRate> for u32 {
    fn from(value: BaudRate) -> Self {
        match value {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
        }
    }
}

/// Status condition register (`STAT?`), one byte.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCondition {
    /// Output regulating in constant voltage.
    pub constant_voltage: bool,
    /// Output regulating in constant current.
    pub constant_current: bool,
    /// No fault is active.
    pub no_fault: bool,
    /// At least one fault is active.
    pub fault: bool,
    /// Auto-restart is selected.
    pub autostart: bool,
    /// Foldback protection is armed.
    pub foldback_armed: bool,
    #[skip]
    __: B1,
    /// Front panel (local) control.
    pub local_mode: bool,
}

impl StatusCondition {
    pub fn from_code(code: u8) -> Self {
        Self::from_bytes([code])
    }

    pub fn code(self) -> u8 {
        self.into_bytes()[0]
    }
}

/// Fault condition register (`FLT?`), one byte.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultCondition {
    #[skip]
    __: B1,
    /// AC input failure.
    pub ac_fail: bool,
    /// Over-temperature shutdown.
    pub over_temperature: bool,
    /// Foldback protection tripped.
    pub foldback: bool,
    /// Over-voltage protection tripped.
    pub over_voltage: bool,
    /// Shut off by the rear-panel analog control.
    pub shut_off: bool,
    /// Output is off.
    pub output_off: bool,
    /// Enable connector open.
    pub enable_open: bool,
}

impl FaultCondition {
    pub fn from_code(code: u8) -> Self {
        Self::from_bytes([code])
    }

    pub fn code(self) -> u8 {
        self.into_bytes()[0]
    }
}

/// The six register bytes delivered by the fast read registers query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastRegisters {
    pub status_condition: u8,
    pub status_enable: u8,
    pub status_event: u8,
    pub fault_condition: u8,
    pub fault_enable: u8,
    pub fault_event: u8,
}

impl From<[u8; 6]> for FastRegisters {
    fn from(bytes: [u8; 6]) -> Self {
        Self {
            status_condition: bytes[0],
            status_enable: bytes[1],
            status_event: bytes[2],
            fault_condition: bytes[3],
            fault_enable: bytes[4],
            fault_event: bytes[5],
        }
    }
}

/// A reply payload that did not match its expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedReply;

/// The six display values returned by `DVC?`, comma separated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub voltage_measured: f32,
    pub voltage_programmed: f32,
    pub current_measured: f32,
    pub current_programmed: f32,
    pub over_voltage: f32,
    pub under_voltage: f32,
}

impl FromStr for Measurements {
    type Err = MalformedReply;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let mut next = || -> Result<f32, MalformedReply> {
            parts
                .next()
                .ok_or(MalformedReply)?
                .trim()
                .parse()
                .map_err(|_| MalformedReply)
        };
        let parsed = Self {
            voltage_measured: next()?,
            voltage_programmed: next()?,
            current_measured: next()?,
            current_programmed: next()?,
            over_voltage: next()?,
            under_voltage: next()?,
        };
        drop(next);
        if parts.next().is_some() {
            return Err(MalformedReply);
        }
        Ok(parsed)
    }
}

/// The complete status snapshot returned by `STT?`.
///
/// The supply labels each field, e.g.
/// `MV(40.050),PV(40.000),MC(9.985),PC(10.000),SR(04),FR(00)`; the two
/// trailing fields are the status and fault condition registers in hex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub voltage_measured: f32,
    pub voltage_programmed: f32,
    pub current_measured: f32,
    pub current_programmed: f32,
    pub status_register: u8,
    pub fault_register: u8,
}

impl StatusReport {
    pub fn status(&self) -> StatusCondition {
        StatusCondition::from_code(self.status_register)
    }

    pub fn faults(&self) -> FaultCondition {
        FaultCondition::from_code(self.fault_register)
    }
}

/// The value between a labelled field's parentheses, or the bare token when a
/// firmware revision omits the label.
fn unlabelled(token: &str) -> &str {
    match (token.find('('), token.rfind(')')) {
        (Some(open), Some(close)) if open < close => &token[open + 1..close],
        _ => token.trim(),
    }
}

impl FromStr for StatusReport {
    type Err = MalformedReply;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let mut field = || parts.next().map(unlabelled).ok_or(MalformedReply);

        let voltage_measured = field()?.parse().map_err(|_| MalformedReply)?;
        let voltage_programmed = field()?.parse().map_err(|_| MalformedReply)?;
        let current_measured = field()?.parse().map_err(|_| MalformedReply)?;
        let current_programmed = field()?.parse().map_err(|_| MalformedReply)?;
        let status_register =
            u8::from_str_radix(field()?, 16).map_err(|_| MalformedReply)?;
        let fault_register =
            u8::from_str_radix(field()?, 16).map_err(|_| MalformedReply)?;
        drop(field);
        if parts.next().is_some() {
            return Err(MalformedReply);
        }

        Ok(Self {
            voltage_measured,
            voltage_programmed,
            current_measured,
            current_programmed,
            status_register,
            fault_register,
        })
    }
}
