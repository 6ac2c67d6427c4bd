//! Our error types for Genesys serial exchanges.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// An error reply sent back by the supply instead of `OK` or data.
///
/// The supply distinguishes frames it could not accept (`C01`-`C05`) from
/// settings it refused in its present state (`E01`-`E08`).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// `C0x` reply.
    #[error("command error C{0:02}")]
    Command(u8),
    /// `E0x` reply.
    #[error("execution error E{0:02}")]
    Execution(u8),
}

impl DeviceError {
    /// The numeric part of the reply, e.g. 4 for `E04`.
    pub fn code(&self) -> u8 {
        match self {
            Self::Command(code) | Self::Execution(code) => *code,
        }
    }

    /// Manual-derived meaning of the code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Command(1) => "illegal command or query",
            Self::Command(2) => "missing parameter",
            Self::Command(3) => "illegal parameter",
            Self::Command(4) => "checksum error",
            Self::Command(5) => "setting out of range",
            Self::Command(_) => "unlisted command error",
            Self::Execution(1) => "voltage programmed above the acceptable range",
            Self::Execution(2) => "voltage programmed below the under-voltage limit",
            Self::Execution(4) => "over-voltage protection programmed below the acceptable range",
            Self::Execution(6) => "under-voltage limit programmed above the acceptable range",
            Self::Execution(7) => "output on refused during a fault shutdown",
            Self::Execution(_) => "unlisted execution error",
        }
    }
}

/// Everything that can go wrong in one command/response exchange.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("serial communication error")]
    Serial(I),
    /// Addresses outside 0-30 are rejected before anything is transmitted.
    #[error("unit address {0} outside the multi-drop range")]
    Address(u8),
    /// No terminator arrived before the transport's read deadline.
    #[error("timed out waiting for a reply terminator")]
    Timeout,
    #[error("supply rejected the command: {0}")]
    Device(DeviceError),
    /// The reply did not match the command's expected grammar, or a payload
    /// would not parse.
    #[error("malformed or unexpected reply")]
    Reply,
    /// A setpoint failed range validation; nothing was transmitted.
    #[error("setpoint outside the permitted window")]
    Setpoint,
    #[error("unrecognized identity reply")]
    Identity,
    /// A fast-query reply failed its checksum.
    #[error("fast query checksum mismatch")]
    Checksum,
    #[error("frame longer than the channel buffer")]
    Overflow,
}
