//! High-level handle for one supply on the bus.
//!
//! For its methods we generally use the nomenclature that "program"/"set"
//! means writing a setting, "get"-style bare names read a setting back, and
//! "measured" values are live readings.

use embedded_io::{Read, Write};

use crate::{
    channel::{Channel, Response},
    command::{Command, FilterFrequency, GroupCommand, RemoteMode, Switch},
    error::{Error, Result},
    ratings::Ratings,
    register::{FaultCondition, Measurements, OperationMode, StatusCondition, StatusReport},
};

/// One Genesys supply on a shared bus.
///
/// The handle holds only the unit address and the ratings learned during
/// [`Genesys::connect`]; the serial [`Channel`] is passed explicitly to every
/// call, so any number of handles can share one RS-485 line and the caller
/// keeps control over exchange ordering.
#[derive(Debug, Clone, Copy)]
pub struct Genesys {
    address: u8,
    ratings: Ratings,
}

impl Genesys {
    /// Establish communication with the unit at `address`.
    ///
    /// Locks out the front panel (`RMT LLO`) so only programmatic control is
    /// possible, then learns the model ratings from `IDN?`. Deliberately
    /// issues nothing else: whatever state the supply was in beforehand
    /// stays entirely intact. Use [`Genesys::reset`] to reach a known state.
    pub fn connect<S, const L: usize>(
        channel: &mut Channel<S, L>,
        address: u8,
    ) -> Result<Self, S::Error>
    where
        S: Read + Write,
    {
        channel.select(address)?;
        channel.send(&Command::Remote(RemoteMode::Llo))?;
        let ratings = match channel.send(&Command::Identity)? {
            Response::Data(identity) => {
                Ratings::from_identity(identity).ok_or(Error::Identity)?
            }
            _ => return Err(Error::Reply),
        };
        Ok(Self { address, ratings })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    /// `CLS` - zero the status and fault event registers.
    pub fn clear_status<S, const L: usize>(&self, channel: &mut Channel<S, L>) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::ClearStatus)
    }

    /// `RST` - bring the supply to a safe, known state: output off, both
    /// setpoints zero, OVP at maximum, UVL at zero, foldback and auto-start
    /// off, remote mode `REM`.
    pub fn reset<S, const L: usize>(&self, channel: &mut Channel<S, L>) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Reset)
    }

    /// `RMT` - program the remote/local mode.
    pub fn set_remote_mode<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        mode: RemoteMode,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Remote(mode))
    }

    /// `RMT?`
    pub fn remote_mode<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<RemoteMode, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::RemoteQuery)
    }

    /// `MDAV?` - whether the multi-drop option is installed.
    pub fn multi_drop_installed<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<bool, S::Error>
    where
        S: Read + Write,
    {
        Ok(self.query::<u8, S, L>(channel, &Command::MultiDropQuery)? != 0)
    }

    /// `MS?` - master/slave parallel operation setting, 0-4.
    pub fn parallel_operation<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<u8, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::ParallelQuery)
    }

    /// `\` - ask the supply to re-execute its previous command, e.g. inside a
    /// service-request recovery routine. The reply is returned verbatim
    /// because only the supply knows whether that command was a query.
    pub fn repeat_last<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<heapless::String<L>, S::Error>
    where
        S: Read + Write,
    {
        let mut out = heapless::String::new();
        let raw = match channel.transact(self.address, &Command::RepeatLast)? {
            Response::Ok => "OK",
            Response::Data(text) => text,
            Response::Err(_) => return Err(Error::Reply),
        };
        out.push_str(raw).map_err(|_| Error::Overflow)?;
        Ok(out)
    }

    /// `IDN?` - e.g. `Lambda, GEN40-38`.
    pub fn identity<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<heapless::String<L>, S::Error>
    where
        S: Read + Write,
    {
        self.query_text(channel, &Command::Identity)
    }

    /// `REV?` - firmware revision.
    pub fn revision<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<heapless::String<L>, S::Error>
    where
        S: Read + Write,
    {
        self.query_text(channel, &Command::Revision)
    }

    /// `SN?`
    pub fn serial_number<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<heapless::String<L>, S::Error>
    where
        S: Read + Write,
    {
        self.query_text(channel, &Command::SerialNumber)
    }

    /// `DATE?` - date of last factory test.
    pub fn test_date<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<heapless::String<L>, S::Error>
    where
        S: Read + Write,
    {
        self.query_text(channel, &Command::TestDate)
    }

    /// `PV` - program the output voltage.
    ///
    /// The setpoint must lie inside the model's rated range and inside the
    /// window the supply accepts right now: the device holds
    /// `UVL <= volts * 0.95` and `volts * 1.05 <= OVP`, so the present UVL
    /// and OVP settings are read back and checked before anything is
    /// programmed. Setting UVL to its minimum and OVP to its maximum first
    /// keeps the window out of the way.
    pub fn program_voltage<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        volts: f32,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        if !(0.0..=self.ratings.voltage_max()).contains(&volts) {
            return Err(Error::Setpoint);
        }
        let floor = self.under_voltage_limit(channel)? / 0.95;
        let ceiling = self.over_voltage_protection(channel)? / 1.05;
        if volts < floor || volts > ceiling {
            return Err(Error::Setpoint);
        }
        self.run(channel, &Command::ProgramVoltage(volts))
    }

    /// `PV?` - programmed voltage setpoint.
    pub fn voltage_setpoint<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<f32, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::VoltageSetpointQuery)
    }

    /// `MV?` - measured output voltage.
    pub fn measured_voltage<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<f32, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::VoltageQuery)
    }

    /// `PC` - program the output current limit.
    pub fn program_current<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        amps: f32,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        if !(0.0..=self.ratings.current_max).contains(&amps) {
            return Err(Error::Setpoint);
        }
        self.run(channel, &Command::ProgramCurrent(amps))
    }

    /// `PC?` - programmed current setpoint.
    pub fn current_setpoint<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<f32, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::CurrentSetpointQuery)
    }

    /// `MC?` - measured output current.
    pub fn measured_current<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<f32, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::CurrentQuery)
    }

    /// `MODE?` - CV, CC, or OFF while the output is disabled.
    pub fn operation_mode<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<OperationMode, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::ModeQuery)
    }

    /// `DVC?` - the six display values in a single exchange.
    pub fn measurements<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<Measurements, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::DisplayQuery)
    }

    /// `STT?` - complete status snapshot including both condition registers.
    pub fn status<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<StatusReport, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::StatusQuery)
    }

    /// `FILTER` - A/D converter low-pass filter frequency.
    pub fn set_filter<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        frequency: FilterFrequency,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Filter(frequency))
    }

    /// `FILTER?`
    pub fn filter<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<FilterFrequency, S::Error>
    where
        S: Read + Write,
    {
        let hertz = self.query::<u8, S, L>(channel, &Command::FilterQuery)?;
        FilterFrequency::from_hertz(hertz).ok_or(Error::Reply)
    }

    /// `OUT` - switch the output on or off.
    pub fn set_output<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        state: impl Into<Switch>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Output(state.into()))
    }

    /// `OUT?`
    pub fn output<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<Switch, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::OutputQuery)
    }

    /// `FLD` - arm or disarm foldback protection.
    pub fn set_foldback<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        state: impl Into<Switch>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Foldback(state.into()))
    }

    /// `FLD?`
    pub fn foldback<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<Switch, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::FoldbackQuery)
    }

    /// `FDB` - extra foldback delay in milliseconds on top of the fixed
    /// 250 ms.
    pub fn set_foldback_delay<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        millis: u8,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::FoldbackDelay(millis))
    }

    /// `FBD?` - total foldback delay in milliseconds, 250-505.
    pub fn foldback_delay<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<u16, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::FoldbackDelayQuery)
    }

    /// `FBDRST` - drop the extra foldback delay back to zero.
    pub fn reset_foldback_delay<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::FoldbackDelayReset)
    }

    /// `OVP` - program the over-voltage protection level.
    ///
    /// Checked against the model's OVP window and against the present
    /// voltage setpoint: the supply refuses OVP below `PV * 1.05`.
    pub fn program_over_voltage<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        volts: f32,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        let (min, max) = self.ratings.ovp_range();
        if !(min..=max).contains(&volts) {
            return Err(Error::Setpoint);
        }
        let floor = self.voltage_setpoint(channel)? * 1.05;
        if volts < floor {
            return Err(Error::Setpoint);
        }
        self.run(channel, &Command::OverVoltage(volts))
    }

    /// `OVP?`
    pub fn over_voltage_protection<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<f32, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::OverVoltageQuery)
    }

    /// `OVM` - set over-voltage protection to its maximum.
    pub fn set_over_voltage_max<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::OverVoltageMax)
    }

    /// `UVL` - program the under-voltage limit.
    ///
    /// Checked against the model's UVL window and against the present
    /// voltage setpoint: the supply refuses UVL above `PV * 0.95`.
    pub fn program_under_voltage<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        volts: f32,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        if !(0.0..=self.ratings.uvl_max()).contains(&volts) {
            return Err(Error::Setpoint);
        }
        let ceiling = self.voltage_setpoint(channel)? * 0.95;
        if volts > ceiling {
            return Err(Error::Setpoint);
        }
        self.run(channel, &Command::UnderVoltage(volts))
    }

    /// `UVL?`
    pub fn under_voltage_limit<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<f32, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::UnderVoltageQuery)
    }

    /// `AST` - select auto-restart or safe-start behaviour at power-on.
    pub fn set_autostart<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        state: impl Into<Switch>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Autostart(state.into()))
    }

    /// `AST?`
    pub fn autostart<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<Switch, S::Error>
    where
        S: Read + Write,
    {
        self.query(channel, &Command::AutostartQuery)
    }

    /// `SAV` - store the present settings as the last-settings memory.
    pub fn save_settings<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Save)
    }

    /// `RCL` - restore the last-settings memory. This can change the unit's
    /// address and baud rate; call [`Channel::forget_selection`] afterwards
    /// if the stored address may differ.
    pub fn recall_settings<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::Recall)
    }

    /// `STAT?` - status condition register.
    pub fn status_condition<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<StatusCondition, S::Error>
    where
        S: Read + Write,
    {
        Ok(StatusCondition::from_code(
            self.query_register(channel, &Command::StatusConditionQuery)?,
        ))
    }

    /// `SENA` - program the status enable register.
    pub fn set_status_enable<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        mask: u8,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::StatusEnable(mask))
    }

    /// `SENA?`
    pub fn status_enable<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<u8, S::Error>
    where
        S: Read + Write,
    {
        self.query_register(channel, &Command::StatusEnableQuery)
    }

    /// `SEVE?` - status event register, cleared by reading or `CLS`.
    pub fn status_event<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<u8, S::Error>
    where
        S: Read + Write,
    {
        self.query_register(channel, &Command::StatusEventQuery)
    }

    /// `FLT?` - fault condition register.
    pub fn fault_condition<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<FaultCondition, S::Error>
    where
        S: Read + Write,
    {
        Ok(FaultCondition::from_code(
            self.query_register(channel, &Command::FaultConditionQuery)?,
        ))
    }

    /// `FENA` - program the fault enable register.
    ///
    /// Enabled faults raise service requests, which may arrive at any time
    /// and collide with other traffic; handling them is the caller's
    /// business.
    pub fn set_fault_enable<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        mask: u8,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        self.run(channel, &Command::FaultEnable(mask))
    }

    /// `FENA?`
    pub fn fault_enable<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<u8, S::Error>
    where
        S: Read + Write,
    {
        self.query_register(channel, &Command::FaultEnableQuery)
    }

    /// `FEVE?` - fault event register, cleared by reading or `CLS`.
    pub fn fault_event<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
    ) -> Result<u8, S::Error>
    where
        S: Read + Write,
    {
        self.query_register(channel, &Command::FaultEventQuery)
    }

    fn run<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        command: &Command,
    ) -> Result<(), S::Error>
    where
        S: Read + Write,
    {
        channel.transact(self.address, command)?;
        Ok(())
    }

    fn query<T, S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        command: &Command,
    ) -> Result<T, S::Error>
    where
        T: core::str::FromStr,
        S: Read + Write,
    {
        match channel.transact(self.address, command)? {
            Response::Data(text) => text.trim().parse().map_err(|_| Error::Reply),
            _ => Err(Error::Reply),
        }
    }

    /// Registers travel as unprefixed hex.
    fn query_register<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        command: &Command,
    ) -> Result<u8, S::Error>
    where
        S: Read + Write,
    {
        match channel.transact(self.address, command)? {
            Response::Data(text) => {
                u8::from_str_radix(text.trim(), 16).map_err(|_| Error::Reply)
            }
            _ => Err(Error::Reply),
        }
    }

    fn query_text<S, const L: usize>(
        &self,
        channel: &mut Channel<S, L>,
        command: &Command,
    ) -> Result<heapless::String<L>, S::Error>
    where
        S: Read + Write,
    {
        let mut out = heapless::String::new();
        match channel.transact(self.address, command)? {
            Response::Data(text) => out.push_str(text).map_err(|_| Error::Overflow)?,
            _ => return Err(Error::Reply),
        }
        Ok(out)
    }
}

/// `GRST` - reset every supply on the bus; see [`Genesys::reset`] for the
/// resulting state. Allow [`crate::channel::GROUP_SETTLE`] before the next
/// frame, as with every broadcast below.
pub fn group_reset<S, const L: usize>(channel: &mut Channel<S, L>) -> Result<(), S::Error>
where
    S: Read + Write,
{
    channel.group(&GroupCommand::Reset)
}

/// `GPV` - program the voltage of every supply on the bus. The value must be
/// acceptable to all of them; there is no reply to say otherwise.
pub fn group_program_voltage<S, const L: usize>(
    channel: &mut Channel<S, L>,
    volts: f32,
) -> Result<(), S::Error>
where
    S: Read + Write,
{
    channel.group(&GroupCommand::ProgramVoltage(volts))
}

/// `GPC` - program the current limit of every supply on the bus.
pub fn group_program_current<S, const L: usize>(
    channel: &mut Channel<S, L>,
    amps: f32,
) -> Result<(), S::Error>
where
    S: Read + Write,
{
    channel.group(&GroupCommand::ProgramCurrent(amps))
}

/// `GOUT` - switch every output on the bus.
pub fn group_set_output<S, const L: usize>(
    channel: &mut Channel<S, L>,
    state: impl Into<Switch>,
) -> Result<(), S::Error>
where
    S: Read + Write,
{
    channel.group(&GroupCommand::Output(state.into()))
}

/// `GSAV` - store the present settings of every supply.
pub fn group_save_settings<S, const L: usize>(channel: &mut Channel<S, L>) -> Result<(), S::Error>
where
    S: Read + Write,
{
    channel.group(&GroupCommand::Save)
}

/// `GRCL` - restore the stored settings of every supply. Stored addresses
/// may differ from the present ones, so the channel's cached selection is
/// best forgotten afterwards.
pub fn group_recall_settings<S, const L: usize>(channel: &mut Channel<S, L>) -> Result<(), S::Error>
where
    S: Read + Write,
{
    channel.group(&GroupCommand::Recall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_serial::MockSerial;
    use crate::ratings::VoltageClass;

    /// A connected GEN40-38 at address 6 with the connect traffic cleared.
    fn bench() -> (Channel<MockSerial>, Genesys) {
        let mut mock = MockSerial::new();
        mock.queue(b"OK\rOK\rLambda, GEN40-38\r");
        let mut channel: Channel<MockSerial> = Channel::new(mock);
        let psu = Genesys::connect(&mut channel, 6).unwrap();
        channel.transport_mut().clear_written();
        (channel, psu)
    }

    #[test]
    fn connect_locks_out_the_panel_and_learns_ratings() {
        let mut mock = MockSerial::new();
        mock.queue(b"OK\rOK\rLambda, GEN40-38\r");
        let mut channel: Channel<MockSerial> = Channel::new(mock);

        let psu = Genesys::connect(&mut channel, 6).unwrap();
        assert_eq!(
            channel.transport().written_text(),
            "ADR 6\rRMT LLO\rIDN?\r"
        );
        assert_eq!(psu.address(), 6);
        assert_eq!(psu.ratings().class, VoltageClass::Gen40);
        assert_eq!(psu.ratings().voltage_max(), 40.0);
        assert_eq!(psu.ratings().current_max, 38.0);
    }

    #[test]
    fn connect_refuses_unknown_models() {
        let mut mock = MockSerial::new();
        mock.queue(b"OK\rOK\rAcme, PSU-9000\r");
        let mut channel: Channel<MockSerial> = Channel::new(mock);
        assert!(matches!(
            Genesys::connect(&mut channel, 1),
            Err(Error::Identity)
        ));
    }

    #[test]
    fn voltage_round_trips_through_the_wire_format() {
        let (mut channel, psu) = bench();
        channel
            .transport_mut()
            .queue(b"0.000\r44.000\rOK\r12.500\r");

        psu.program_voltage(&mut channel, 12.5).unwrap();
        let read_back = psu.voltage_setpoint(&mut channel).unwrap();
        assert_eq!(read_back, 12.5);
        // The unit is already listening, so no re-addressing happens.
        assert_eq!(
            channel.transport().written_text(),
            "UVL?\rOVP?\rPV 12.500\rPV?\r"
        );
    }

    #[test]
    fn voltage_outside_the_rated_range_never_transmits() {
        let (mut channel, psu) = bench();
        assert!(matches!(
            psu.program_voltage(&mut channel, 40.5),
            Err(Error::Setpoint)
        ));
        assert!(matches!(
            psu.program_voltage(&mut channel, -1.0),
            Err(Error::Setpoint)
        ));
        assert!(channel.transport().written().is_empty());
    }

    #[test]
    fn voltage_outside_the_present_window_is_refused() {
        let (mut channel, psu) = bench();
        // UVL 10 V: anything below 10 / 0.95 is refused before `PV` goes out.
        channel.transport_mut().queue(b"10.000\r44.000\r");
        assert!(matches!(
            psu.program_voltage(&mut channel, 5.0),
            Err(Error::Setpoint)
        ));
        assert_eq!(channel.transport().written_text(), "UVL?\rOVP?\r");
    }

    #[test]
    fn current_validates_against_the_rating() {
        let (mut channel, psu) = bench();
        assert!(matches!(
            psu.program_current(&mut channel, 38.5),
            Err(Error::Setpoint)
        ));
        assert!(channel.transport().written().is_empty());

        channel.transport_mut().queue(b"OK\r19.000\r");
        psu.program_current(&mut channel, 19.0).unwrap();
        assert_eq!(psu.current_setpoint(&mut channel).unwrap(), 19.0);
        assert_eq!(
            channel.transport().written_text(),
            "PC 19.000\rPC?\r"
        );
    }

    #[test]
    fn over_voltage_respects_both_windows() {
        let (mut channel, psu) = bench();
        // Outside the model table.
        assert!(matches!(
            psu.program_over_voltage(&mut channel, 1.0),
            Err(Error::Setpoint)
        ));
        assert!(channel.transport().written().is_empty());

        // Below the present setpoint's 105 % margin.
        channel.transport_mut().queue(b"20.000\r");
        assert!(matches!(
            psu.program_over_voltage(&mut channel, 20.5),
            Err(Error::Setpoint)
        ));

        channel.transport_mut().queue(b"20.000\rOK\r");
        psu.program_over_voltage(&mut channel, 22.0).unwrap();
        assert!(
            channel
                .transport()
                .written_text()
                .ends_with("PV?\rOVP 22.000\r")
        );
    }

    #[test]
    fn under_voltage_respects_both_windows() {
        let (mut channel, psu) = bench();
        assert!(matches!(
            psu.program_under_voltage(&mut channel, 39.0),
            Err(Error::Setpoint)
        ));
        assert!(channel.transport().written().is_empty());

        // Above 95 % of the present setpoint.
        channel.transport_mut().queue(b"20.000\r");
        assert!(matches!(
            psu.program_under_voltage(&mut channel, 19.5),
            Err(Error::Setpoint)
        ));

        channel.transport_mut().queue(b"20.000\rOK\r");
        psu.program_under_voltage(&mut channel, 15.0).unwrap();
        assert!(
            channel
                .transport()
                .written_text()
                .ends_with("PV?\rUVL 15.000\r")
        );
    }

    #[test]
    fn mode_and_switch_replies_parse() {
        let (mut channel, psu) = bench();
        channel
            .transport_mut()
            .queue(b"CV\rON\rOFF\rLLO\r1\r2\r");

        assert_eq!(
            psu.operation_mode(&mut channel).unwrap(),
            OperationMode::Cv
        );
        assert_eq!(psu.output(&mut channel).unwrap(), Switch::On);
        assert_eq!(psu.foldback(&mut channel).unwrap(), Switch::Off);
        assert_eq!(psu.remote_mode(&mut channel).unwrap(), RemoteMode::Llo);
        assert!(psu.multi_drop_installed(&mut channel).unwrap());
        assert_eq!(psu.parallel_operation(&mut channel).unwrap(), 2);
    }

    #[test]
    fn measurements_and_status_parse() {
        let (mut channel, psu) = bench();
        channel.transport_mut().queue(
            b"40.050,40.000,9.985,10.000,44.000,0.000\r\
              MV(40.050),PV(40.000),MC(9.985),PC(10.000),SR(31),FR(00)\r",
        );

        let readout = psu.measurements(&mut channel).unwrap();
        assert_eq!(readout.voltage_measured, 40.05);
        assert_eq!(readout.under_voltage, 0.0);

        let report = psu.status(&mut channel).unwrap();
        assert_eq!(report.status_register, 0x31);
        assert!(report.status().constant_voltage());
        assert!(report.status().autostart());
        assert!(!report.faults().over_voltage());
        assert_eq!(
            channel.transport().written_text(),
            "DVC?\rSTT?\r"
        );
    }

    #[test]
    fn registers_travel_as_hex() {
        let (mut channel, psu) = bench();
        channel.transport_mut().queue(b"OK\rB0\r04\r50\r");

        psu.set_fault_enable(&mut channel, 0xB0).unwrap();
        assert_eq!(psu.fault_enable(&mut channel).unwrap(), 0xB0);
        assert_eq!(psu.status_event(&mut channel).unwrap(), 0x04);
        let faults = psu.fault_condition(&mut channel).unwrap();
        assert!(faults.over_voltage());
        assert!(faults.output_off());
        assert_eq!(
            channel.transport().written_text(),
            "FENA B0\rFENA?\rSEVE?\rFLT?\r"
        );
    }

    #[test]
    fn foldback_delay_round_trip() {
        let (mut channel, psu) = bench();
        channel.transport_mut().queue(b"OK\r505\rOK\r250\r");

        psu.set_foldback_delay(&mut channel, 255).unwrap();
        assert_eq!(psu.foldback_delay(&mut channel).unwrap(), 505);
        psu.reset_foldback_delay(&mut channel).unwrap();
        assert_eq!(psu.foldback_delay(&mut channel).unwrap(), 250);
        assert_eq!(
            channel.transport().written_text(),
            "FDB 255\rFBD?\rFBDRST\rFBD?\r"
        );
    }

    #[test]
    fn filter_round_trip() {
        let (mut channel, psu) = bench();
        channel.transport_mut().queue(b"OK\r46\r");
        psu.set_filter(&mut channel, FilterFrequency::Hz46).unwrap();
        assert_eq!(psu.filter(&mut channel).unwrap(), FilterFrequency::Hz46);
        assert_eq!(channel.transport().written_text(), "FILTER 46\rFILTER?\r");
    }

    #[test]
    fn two_handles_share_one_channel() {
        let mut mock = MockSerial::new();
        mock.queue(b"OK\rOK\rLambda, GEN40-38\rOK\rOK\rLambda, GEN6-100\r");
        let mut channel: Channel<MockSerial> = Channel::new(mock);
        let first = Genesys::connect(&mut channel, 0).unwrap();
        let second = Genesys::connect(&mut channel, 1).unwrap();
        channel.transport_mut().clear_written();

        channel.transport_mut().queue(b"OK\r12.000\rOK\rOK\r5.000\r");
        assert_eq!(first.voltage_setpoint(&mut channel).unwrap(), 12.0);
        second.program_current(&mut channel, 5.0).unwrap();
        assert_eq!(second.current_setpoint(&mut channel).unwrap(), 5.0);
        // Switching units re-addresses exactly once.
        assert_eq!(
            channel.transport().written_text(),
            "ADR 0\rPV?\rADR 1\rPC 5.000\rPC?\r"
        );
    }

    #[test]
    fn repeat_last_returns_either_shape() {
        let (mut channel, psu) = bench();
        channel.transport_mut().queue(b"OK\r40.000\r");
        assert_eq!(psu.repeat_last(&mut channel).unwrap().as_str(), "OK");
        assert_eq!(psu.repeat_last(&mut channel).unwrap().as_str(), "40.000");
        assert_eq!(channel.transport().written_text(), "\\\r\\\r");
    }

    #[test]
    fn broadcasts_render_the_group_vocabulary() {
        let (mut channel, _) = bench();
        group_reset(&mut channel).unwrap();
        group_program_voltage(&mut channel, 5.0).unwrap();
        group_program_current(&mut channel, 0.1).unwrap();
        group_set_output(&mut channel, Switch::Off).unwrap();
        group_save_settings(&mut channel).unwrap();
        group_recall_settings(&mut channel).unwrap();
        assert_eq!(
            channel.transport().written_text(),
            "GRST\rGPV 05.000\rGPC 00.100\rGOUT OFF\rGSAV\rGRCL\r"
        );
    }
}
