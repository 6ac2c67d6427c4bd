//! CR-framed command/response exchanges on the shared serial bus.
//!
//! The channel owns the transport exclusively: RS-485 is a single multi-drop
//! medium, so one exchange is in flight at a time and callers serialize
//! access by holding the `&mut`. A unit must be put into listen mode with
//! `ADR` before it will answer; the most recently addressed unit keeps
//! listening, so the channel caches the selection and only re-addresses when
//! the target changes.

use core::fmt::Write as _;

use embedded_io::{Error as _, ErrorKind, Read, Write};

use crate::{
    command::{ADDRESS_MAX, Command, GroupCommand, ReplyGrammar, TERMINATOR},
    error::{DeviceError, Error, Result},
    register::FastRegisters,
};

/// Read deadline that comfortably covers the slowest supported baud rate;
/// the transport owns the actual clock.
pub const RECOMMENDED_READ_TIMEOUT: fugit::MillisDurationU32 =
    fugit::MillisDurationU32::millis(500);

/// Quiet period the bus needs after a broadcast before the next frame
/// (manual 7.8.1). Broadcasts are unacknowledged, so the caller owns the
/// wait.
pub const GROUP_SETTLE: fugit::MillisDurationU32 = fugit::MillisDurationU32::millis(200);

/// Window within which a supply answers a fast query (manual 7.9), plus bus
/// transmission time.
pub const FAST_QUERY_WINDOW: fugit::MillisDurationU32 = fugit::MillisDurationU32::millis(30);

/// Where the channel currently is within an exchange.
///
/// Surfaced so callers and tests can confirm that an error left the link
/// ready for the next frame; there is no automatic retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    /// `ADR` transmitted, waiting for its acknowledge.
    Addressing,
    /// A command frame transmitted, waiting for the reply terminator.
    AwaitingReply,
}

/// A classified reply frame, terminator stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    /// Imperative acknowledge.
    Ok,
    /// Interrogative payload.
    Data(&'a str),
    /// Device-reported rejection.
    Err(DeviceError),
}

impl<'a> Response<'a> {
    /// Classify one raw reply.
    pub fn parse(raw: &'a str) -> Self {
        if raw == "OK" {
            return Self::Ok;
        }
        if let Some(code) = error_code(raw) {
            return Self::Err(code);
        }
        Self::Data(raw)
    }
}

fn hex_pair(bytes: &[u8]) -> Option<u8> {
    let text = core::str::from_utf8(bytes).ok()?;
    u8::from_str_radix(text, 16).ok()
}

fn error_code(raw: &str) -> Option<DeviceError> {
    let bytes = raw.as_bytes();
    if bytes.len() != 3 || !bytes[1].is_ascii_digit() || !bytes[2].is_ascii_digit() {
        return None;
    }
    let code = (bytes[1] - b'0') * 10 + (bytes[2] - b'0');
    match bytes[0] {
        b'E' => Some(DeviceError::Execution(code)),
        b'C' => Some(DeviceError::Command(code)),
        _ => None,
    }
}

/// Exclusive owner of the serial line shared by every supply on the bus.
///
/// `L` bounds frame and reply length; the vendor's longest reply (`STT?`)
/// fits in the 64-byte default.
pub struct Channel<S: Read + Write, const L: usize = 64> {
    interface: S,
    /// Unit currently in listen mode, when known.
    listening: Option<u8>,
    state: LinkState,
    /// Received bytes not yet consumed; a transport read may deliver bytes
    /// past the terminator.
    pending: heapless::Vec<u8, L>,
    /// Reply line of the exchange in progress.
    line: heapless::Vec<u8, L>,
}

impl<S: Read + Write, const L: usize> Channel<S, L> {
    pub fn new(interface: S) -> Self {
        Self {
            interface,
            listening: None,
            state: LinkState::Idle,
            pending: heapless::Vec::new(),
            line: heapless::Vec::new(),
        }
    }

    /// Consume the channel and hand the transport back.
    pub fn release(self) -> S {
        self.interface
    }

    /// Escape hatch to the underlying transport, e.g. to reconfigure a port.
    pub fn transport(&self) -> &S {
        &self.interface
    }

    pub fn transport_mut(&mut self) -> &mut S {
        &mut self.interface
    }

    pub fn link_state(&self) -> LinkState {
        self.state
    }

    /// Which unit the channel believes is listening.
    pub fn listening(&self) -> Option<u8> {
        self.listening
    }

    /// Drop the cached selection, forcing the next exchange to re-address.
    ///
    /// Needed after anything that can change a unit's address behind the
    /// channel's back, e.g. a power cycle or a `GRCL` broadcast.
    pub fn forget_selection(&mut self) {
        self.listening = None;
    }

    /// Put the unit at `address` into listen mode.
    ///
    /// Fails with [`Error::Address`] without transmitting when the address is
    /// outside `0..=ADDRESS_MAX`. Re-selecting the unit that is already
    /// listening is a no-op.
    pub fn select(&mut self, address: u8) -> Result<(), S::Error> {
        if address > ADDRESS_MAX {
            return Err(Error::Address(address));
        }
        if self.listening == Some(address) {
            return Ok(());
        }
        self.listening = None;
        self.exchange(LinkState::Addressing, &Command::SelectAddress(address))?;
        match Response::parse(self.reply()?) {
            Response::Ok => {}
            Response::Err(code) => return Err(Error::Device(code)),
            Response::Data(_) => return Err(Error::Reply),
        }
        self.listening = Some(address);
        Ok(())
    }

    /// Send one command to the listening unit and classify the reply.
    ///
    /// Device error replies surface as [`Error::Device`]; a reply that does
    /// not fit the command's grammar (data for an imperative, `OK` for an
    /// interrogative) is [`Error::Reply`].
    pub fn send(&mut self, command: &Command) -> Result<Response<'_>, S::Error> {
        self.exchange(LinkState::AwaitingReply, command)?;
        let response = Response::parse(self.reply()?);
        match (command.grammar(), response) {
            (_, Response::Err(code)) => Err(Error::Device(code)),
            (ReplyGrammar::Ack, Response::Data(_)) => Err(Error::Reply),
            (ReplyGrammar::Data, Response::Ok) => Err(Error::Reply),
            (_, response) => Ok(response),
        }
    }

    /// Address-aware exchange: select `address` if it is not already
    /// listening, then send the command.
    pub fn transact(&mut self, address: u8, command: &Command) -> Result<Response<'_>, S::Error> {
        self.select(address)?;
        self.send(command)
    }

    /// Broadcast to every supply on the bus.
    ///
    /// Nothing answers a broadcast; keep the bus quiet for [`GROUP_SETTLE`]
    /// before the next frame.
    pub fn group(&mut self, command: &GroupCommand) -> Result<(), S::Error> {
        let mut frame: heapless::String<L> = heapless::String::new();
        write!(frame, "{command}\r").map_err(|_| Error::Overflow)?;
        self.interface
            .write_all(frame.as_bytes())
            .map_err(Error::Serial)?;
        self.interface.flush().map_err(Error::Serial)?;
        Ok(())
    }

    /// Fast connection test (manual 7.9.1).
    ///
    /// `Ok(None)` when the unit stays silent within the response window;
    /// otherwise whether its multi-drop option is enabled.
    pub fn fast_connection_test(&mut self, address: u8) -> Result<Option<bool>, S::Error> {
        if address > ADDRESS_MAX {
            return Err(Error::Address(address));
        }
        match self.fast_query([0xAA, address])? {
            None => Ok(None),
            Some(_) => Ok(Some(self.line.first() == Some(&b'1'))),
        }
    }

    /// Fast read of the six status/fault registers (manual 7.9.2).
    pub fn fast_read_registers(&mut self, address: u8) -> Result<Option<FastRegisters>, S::Error> {
        if address > ADDRESS_MAX {
            return Err(Error::Address(address));
        }
        let probe = 0x80 | address;
        let Some(payload_len) = self.fast_query([probe, probe])? else {
            return Ok(None);
        };
        if payload_len != 12 {
            return Err(Error::Reply);
        }
        let mut registers = [0u8; 6];
        for (index, register) in registers.iter_mut().enumerate() {
            *register =
                hex_pair(&self.line[2 * index..2 * index + 2]).ok_or(Error::Reply)?;
        }
        Ok(Some(FastRegisters::from(registers)))
    }

    /// Lifetime powered-on minutes (manual 7.9.3).
    pub fn fast_power_on_time(&mut self, address: u8) -> Result<Option<u32>, S::Error> {
        if address > ADDRESS_MAX {
            return Err(Error::Address(address));
        }
        let Some(payload_len) = self.fast_query([0xA6, address])? else {
            return Ok(None);
        };
        if payload_len != 8 {
            return Err(Error::Reply);
        }
        let digits = core::str::from_utf8(&self.line[..8]).map_err(|_| Error::Reply)?;
        let minutes = u32::from_str_radix(digits, 16).map_err(|_| Error::Reply)?;
        Ok(Some(minutes))
    }

    /// Write one command frame and pull in the reply line.
    fn exchange(&mut self, busy: LinkState, command: &Command) -> Result<(), S::Error> {
        let mut frame: heapless::String<L> = heapless::String::new();
        write!(frame, "{command}\r").map_err(|_| Error::Overflow)?;
        self.state = busy;
        let outcome = self.write_then_read(frame.as_bytes());
        self.state = LinkState::Idle;
        outcome
    }

    fn write_then_read(&mut self, frame: &[u8]) -> Result<(), S::Error> {
        self.interface.write_all(frame).map_err(Error::Serial)?;
        self.interface.flush().map_err(Error::Serial)?;
        self.read_line()
    }

    /// Two-byte binary query with a checksummed fixed-shape reply.
    ///
    /// Returns the payload length up to the `$` marker, or `None` when the
    /// bus stayed silent.
    fn fast_query(&mut self, query: [u8; 2]) -> Result<Option<usize>, S::Error> {
        self.interface.write_all(&query).map_err(Error::Serial)?;
        self.interface.flush().map_err(Error::Serial)?;
        self.state = LinkState::AwaitingReply;
        let outcome = self.read_line();
        self.state = LinkState::Idle;
        match outcome {
            Ok(()) => {}
            Err(Error::Timeout) => return Ok(None),
            Err(err) => return Err(err),
        }
        let marker = self
            .line
            .iter()
            .rposition(|&byte| byte == b'$')
            .ok_or(Error::Checksum)?;
        if self.line.len() != marker + 3 {
            return Err(Error::Checksum);
        }
        let sum = self.line[..marker]
            .iter()
            .fold(0u8, |acc, &byte| acc.wrapping_add(byte));
        let declared = hex_pair(&self.line[marker + 1..]).ok_or(Error::Checksum)?;
        if sum != declared {
            return Err(Error::Checksum);
        }
        Ok(Some(marker))
    }

    /// Accumulate bytes until the terminator, consuming anything buffered
    /// past the previous reply first.
    ///
    /// On error all buffered bytes are destroyed; a reply arriving after the
    /// deadline must not satisfy the next command.
    fn read_line(&mut self) -> Result<(), S::Error> {
        self.line.clear();
        let outcome = self.fill_line();
        if outcome.is_err() {
            self.pending.clear();
        }
        outcome
    }

    fn fill_line(&mut self) -> Result<(), S::Error> {
        loop {
            if let Some(end) = self.pending.iter().position(|&byte| byte == TERMINATOR) {
                self.line
                    .extend_from_slice(&self.pending[..end])
                    .map_err(|_| Error::Overflow)?;
                // relocate whatever follows the terminator to the front
                let keep = self.pending.len() - (end + 1);
                self.pending.rotate_left(end + 1);
                self.pending.truncate(keep);
                return Ok(());
            }
            if self.pending.is_full() {
                return Err(Error::Overflow);
            }
            let mut chunk = [0u8; 16];
            let limit = chunk.len().min(L - self.pending.len());
            match self.interface.read(&mut chunk[..limit]) {
                Ok(0) => return Err(Error::Timeout),
                Ok(count) => self
                    .pending
                    .extend_from_slice(&chunk[..count])
                    .map_err(|_| Error::Overflow)?,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Err(Error::Timeout),
                Err(err) => return Err(Error::Serial(err)),
            }
        }
    }

    fn reply(&self) -> Result<&str, S::Error> {
        core::str::from_utf8(&self.line).map_err(|_| Error::Reply)
    }
}
