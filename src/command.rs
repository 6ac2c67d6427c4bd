//! The vendor command vocabulary.
//!
//! Every remote operation is one mnemonic plus an optional argument,
//! terminated by a carriage return. The set is flat, so it is modeled as
//! tagged variants keyed by mnemonic; [`core::fmt::Display`] produces the
//! exact on-wire text minus the terminator.

use core::fmt;

use strum_macros::{Display, EnumIter, EnumString};

/// Highest unit address selectable on a multi-drop bus.
pub const ADDRESS_MAX: u8 = 30;

/// Every frame and reply ends with a carriage return.
pub const TERMINATOR: u8 = b'\r';

/// Remote operation mode (`RMT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum RemoteMode {
    /// Front panel control.
    Loc,
    /// Remote control; the front panel can take back control.
    Rem,
    /// Local lockout: remote control with the front panel disabled until the
    /// supply power-cycles or is returned to `Rem`.
    Llo,
}

/// Two-state setting, serialized `ON`/`OFF` (`OUT`, `FLD`, `AST`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Switch {
    #[default]
    Off,
    On,
}

impl From<bool> for Switch {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<Switch> for bool {
    fn from(value: Switch) -> Self {
        matches!(value, Switch::On)
    }
}

/// Low-pass filter frequency of the measurement A/D converter (`FILTER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
#[repr(u8)]
pub enum FilterFrequency {
    Hz18 = 18,
    Hz23 = 23,
    Hz46 = 46,
}

impl FilterFrequency {
    pub fn hertz(self) -> u8 {
        self as u8
    }

    pub fn from_hertz(hertz: u8) -> Option<Self> {
        match hertz {
            18 => Some(Self::Hz18),
            23 => Some(Self::Hz23),
            46 => Some(Self::Hz46),
            _ => None,
        }
    }
}

/// How a well-behaved supply answers a given command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplyGrammar {
    /// A bare `OK`.
    Ack,
    /// A data payload.
    Data,
    /// Either, depending on the command being repeated.
    Any,
}

/// One addressed remote command.
///
/// Interrogatives carry a trailing `?` and reply with data; imperatives reply
/// `OK`. Voltage and current arguments use the 3.3 decimal format the whole
/// Genesys range accepts; register masks are plain uppercase hex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `ADR <n>` - put the unit at address `n` into listen mode.
    SelectAddress(u8),
    /// `CLS` - zero the status and fault event registers.
    ClearStatus,
    /// `RST` - bring the supply to its safe power-on state.
    Reset,
    /// `RMT <mode>`
    Remote(RemoteMode),
    /// `RMT?`
    RemoteQuery,
    /// `MDAV?` - whether the multi-drop option is installed.
    MultiDropQuery,
    /// `MS?` - master/slave parallel operation setting.
    ParallelQuery,
    /// `\` - resend the previous command, e.g. after a collision.
    RepeatLast,
    /// `IDN?`
    Identity,
    /// `REV?`
    Revision,
    /// `SN?`
    SerialNumber,
    /// `DATE?` - date of last factory test.
    TestDate,
    /// `PV <volts>`
    ProgramVoltage(f32),
    /// `PV?`
    VoltageSetpointQuery,
    /// `MV?` - measured output voltage.
    VoltageQuery,
    /// `PC <amps>`
    ProgramCurrent(f32),
    /// `PC?`
    CurrentSetpointQuery,
    /// `MC?` - measured output current.
    CurrentQuery,
    /// `MODE?` - CV, CC or OFF.
    ModeQuery,
    /// `DVC?` - the six display values in one reply.
    DisplayQuery,
    /// `STT?` - complete status snapshot.
    StatusQuery,
    /// `FILTER <hz>`
    Filter(FilterFrequency),
    /// `FILTER?`
    FilterQuery,
    /// `OUT <ON|OFF>`
    Output(Switch),
    /// `OUT?`
    OutputQuery,
    /// `FLD <ON|OFF>`
    Foldback(Switch),
    /// `FLD?`
    FoldbackQuery,
    /// `FDB <ms>` - extra foldback delay on top of the fixed 250 ms.
    FoldbackDelay(u8),
    /// `FBD?` - total foldback delay.
    FoldbackDelayQuery,
    /// `FBDRST`
    FoldbackDelayReset,
    /// `OVP <volts>`
    OverVoltage(f32),
    /// `OVP?`
    OverVoltageQuery,
    /// `OVM` - set over-voltage protection to its maximum.
    OverVoltageMax,
    /// `UVL <volts>`
    UnderVoltage(f32),
    /// `UVL?`
    UnderVoltageQuery,
    /// `AST <ON|OFF>`
    Autostart(Switch),
    /// `AST?`
    AutostartQuery,
    /// `SAV` - store the present settings as the last-settings memory.
    Save,
    /// `RCL` - restore the last-settings memory.
    Recall,
    /// `STAT?` - status condition register.
    StatusConditionQuery,
    /// `SENA <hex>` - status enable register.
    StatusEnable(u8),
    /// `SENA?`
    StatusEnableQuery,
    /// `SEVE?` - status event register.
    StatusEventQuery,
    /// `FLT?` - fault condition register.
    FaultConditionQuery,
    /// `FENA <hex>` - fault enable register.
    FaultEnable(u8),
    /// `FENA?`
    FaultEnableQuery,
    /// `FEVE?` - fault event register.
    FaultEventQuery,
}

impl Command {
    pub(crate) fn grammar(&self) -> ReplyGrammar {
        match self {
            Self::RemoteQuery
            | Self::MultiDropQuery
            | Self::ParallelQuery
            | Self::Identity
            | Self::Revision
            | Self::SerialNumber
            | Self::TestDate
            | Self::VoltageSetpointQuery
            | Self::VoltageQuery
            | Self::CurrentSetpointQuery
            | Self::CurrentQuery
            | Self::ModeQuery
            | Self::DisplayQuery
            | Self::StatusQuery
            | Self::FilterQuery
            | Self::OutputQuery
            | Self::FoldbackQuery
            | Self::FoldbackDelayQuery
            | Self::OverVoltageQuery
            | Self::UnderVoltageQuery
            | Self::AutostartQuery
            | Self::StatusConditionQuery
            | Self::StatusEnableQuery
            | Self::StatusEventQuery
            | Self::FaultConditionQuery
            | Self::FaultEnableQuery
            | Self::FaultEventQuery => ReplyGrammar::Data,
            // The supply remembers whether the repeated command was a query.
            Self::RepeatLast => ReplyGrammar::Any,
            _ => ReplyGrammar::Ack,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectAddress(address) => write!(f, "ADR {address}"),
            Self::ClearStatus => f.write_str("CLS"),
            Self::Reset => f.write_str("RST"),
            Self::Remote(mode) => write!(f, "RMT {mode}"),
            Self::RemoteQuery => f.write_str("RMT?"),
            Self::MultiDropQuery => f.write_str("MDAV?"),
            Self::ParallelQuery => f.write_str("MS?"),
            Self::RepeatLast => f.write_str("\\"),
            Self::Identity => f.write_str("IDN?"),
            Self::Revision => f.write_str("REV?"),
            Self::SerialNumber => f.write_str("SN?"),
            Self::TestDate => f.write_str("DATE?"),
            Self::ProgramVoltage(volts) => write!(f, "PV {volts:.3}"),
            Self::VoltageSetpointQuery => f.write_str("PV?"),
            Self::VoltageQuery => f.write_str("MV?"),
            Self::ProgramCurrent(amps) => write!(f, "PC {amps:.3}"),
            Self::CurrentSetpointQuery => f.write_str("PC?"),
            Self::CurrentQuery => f.write_str("MC?"),
            Self::ModeQuery => f.write_str("MODE?"),
            Self::DisplayQuery => f.write_str("DVC?"),
            Self::StatusQuery => f.write_str("STT?"),
            Self::Filter(frequency) => write!(f, "FILTER {}", frequency.hertz()),
            Self::FilterQuery => f.write_str("FILTER?"),
            Self::Output(state) => write!(f, "OUT {state}"),
            Self::OutputQuery => f.write_str("OUT?"),
            Self::Foldback(state) => write!(f, "FLD {state}"),
            Self::FoldbackQuery => f.write_str("FLD?"),
            Self::FoldbackDelay(millis) => write!(f, "FDB {millis}"),
            Self::FoldbackDelayQuery => f.write_str("FBD?"),
            Self::FoldbackDelayReset => f.write_str("FBDRST"),
            Self::OverVoltage(volts) => write!(f, "OVP {volts:.3}"),
            Self::OverVoltageQuery => f.write_str("OVP?"),
            Self::OverVoltageMax => f.write_str("OVM"),
            Self::UnderVoltage(volts) => write!(f, "UVL {volts:.3}"),
            Self::UnderVoltageQuery => f.write_str("UVL?"),
            Self::Autostart(state) => write!(f, "AST {state}"),
            Self::AutostartQuery => f.write_str("AST?"),
            Self::Save => f.write_str("SAV"),
            Self::Recall => f.write_str("RCL"),
            Self::StatusConditionQuery => f.write_str("STAT?"),
            Self::StatusEnable(mask) => write!(f, "SENA {mask:X}"),
            Self::StatusEnableQuery => f.write_str("SENA?"),
            Self::StatusEventQuery => f.write_str("SEVE?"),
            Self::FaultConditionQuery => f.write_str("FLT?"),
            Self::FaultEnable(mask) => write!(f, "FENA {mask:X}"),
            Self::FaultEnableQuery => f.write_str("FENA?"),
            Self::FaultEventQuery => f.write_str("FEVE?"),
        }
    }
}

/// Broadcast command heard by every supply on the bus (`G` prefix).
///
/// Broadcasts are never acknowledged; the bus must stay quiet for
/// [`crate::channel::GROUP_SETTLE`] before the next frame. Group setpoints
/// use the zero-padded 6-character form so every unit parses the same bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupCommand {
    /// `GRST`
    Reset,
    /// `GPV <volts>`
    ProgramVoltage(f32),
    /// `GPC <amps>`
    ProgramCurrent(f32),
    /// `GOUT <ON|OFF>`
    Output(Switch),
    /// `GSAV`
    Save,
    /// `GRCL`
    Recall,
}

impl fmt::Display for GroupCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => f.write_str("GRST"),
            Self::ProgramVoltage(volts) => write!(f, "GPV {volts:06.3}"),
            Self::ProgramCurrent(amps) => write!(f, "GPC {amps:06.3}"),
            Self::Output(state) => write!(f, "GOUT {state}"),
            Self::Save => f.write_str("GSAV"),
            Self::Recall => f.write_str("GRCL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;
    use strum::IntoEnumIterator;

    fn rendered(command: &Command) -> heapless::String<32> {
        let mut out = heapless::String::new();
        write!(out, "{command}").unwrap();
        out
    }

    #[test]
    fn address_frames_across_the_multi_drop_range() {
        for address in 0..=ADDRESS_MAX {
            let mut expected = heapless::String::<32>::new();
            write!(expected, "ADR {address}").unwrap();
            assert_eq!(rendered(&Command::SelectAddress(address)), expected);
        }
    }

    #[test]
    fn setpoints_use_three_decimals() {
        assert_eq!(rendered(&Command::ProgramVoltage(12.5)).as_str(), "PV 12.500");
        assert_eq!(rendered(&Command::ProgramVoltage(0.2)).as_str(), "PV 0.200");
        assert_eq!(rendered(&Command::ProgramCurrent(8.0)).as_str(), "PC 8.000");
        assert_eq!(
            rendered(&Command::OverVoltage(44.0)).as_str(),
            "OVP 44.000"
        );
        assert_eq!(rendered(&Command::UnderVoltage(0.0)).as_str(), "UVL 0.000");
    }

    #[test]
    fn register_masks_are_hex() {
        assert_eq!(rendered(&Command::StatusEnable(0xFF)).as_str(), "SENA FF");
        assert_eq!(rendered(&Command::FaultEnable(0x0B)).as_str(), "FENA B");
    }

    #[test]
    fn switch_and_mode_vocabulary() {
        assert_eq!(rendered(&Command::Output(Switch::On)).as_str(), "OUT ON");
        assert_eq!(rendered(&Command::Foldback(Switch::Off)).as_str(), "FLD OFF");
        assert_eq!(
            rendered(&Command::Remote(RemoteMode::Llo)).as_str(),
            "RMT LLO"
        );
    }

    #[test]
    fn remote_mode_round_trips_through_text() {
        for mode in RemoteMode::iter() {
            let mut text = heapless::String::<8>::new();
            write!(text, "{mode}").unwrap();
            assert_eq!(text.parse::<RemoteMode>(), Ok(mode));
        }
    }

    #[test]
    fn queries_expect_data() {
        assert_eq!(Command::Identity.grammar(), ReplyGrammar::Data);
        assert_eq!(Command::VoltageSetpointQuery.grammar(), ReplyGrammar::Data);
        assert_eq!(Command::ProgramVoltage(1.0).grammar(), ReplyGrammar::Ack);
        assert_eq!(Command::Save.grammar(), ReplyGrammar::Ack);
        assert_eq!(Command::RepeatLast.grammar(), ReplyGrammar::Any);
    }

    #[test]
    fn group_setpoints_are_zero_padded() {
        let mut out = heapless::String::<16>::new();
        write!(out, "{}", GroupCommand::ProgramVoltage(5.0)).unwrap();
        assert_eq!(out.as_str(), "GPV 05.000");

        out.clear();
        write!(out, "{}", GroupCommand::ProgramCurrent(123.456)).unwrap();
        assert_eq!(out.as_str(), "GPC 123.456");
    }

    #[test]
    fn filter_frequencies() {
        for frequency in FilterFrequency::iter() {
            assert_eq!(
                FilterFrequency::from_hertz(frequency.hertz()),
                Some(frequency)
            );
        }
        assert_eq!(FilterFrequency::from_hertz(42), None);
    }
}
