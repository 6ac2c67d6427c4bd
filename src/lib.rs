//! This crate provides an interface for communicating with and controlling
//! TDK-Lambda Genesys programmable power supplies over their RS-232/RS-485
//! serial port, following Chapter 7 of the vendor manual ("RS232 & RS485
//! Remote Control", document 83-507-013).
//!
//! It supports `no-std` environments by use of the `no_std` feature flag.
//!
//! Any transport implementing [`embedded_io::Read`] and [`embedded_io::Write`]
//! can carry the link, so the same code drives a local COM port, a UART on a
//! microcontroller, or a TCP serial bridge.
//!
//! One [`channel::Channel`] exclusively owns the bus. On RS-485 up to 31
//! supplies (addresses 0-30) share it; a [`psu::Genesys`] handle per unit
//! borrows the channel for each exchange, so only one command is ever in
//! flight.
//!
//! Supply models this should work with include the 750 W and 1500 W 1U
//! Genesys range, GEN6-XY through GEN600-XY.
//!
//! The serial port used for supply comms should be configured like so:
//! * Baud rate: 1200, 2400, 4800, 9600 or 19200 (match the front-panel
//!   setting)
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None

#![cfg_attr(feature = "no_std", no_std)]

pub mod channel;
pub mod command;
pub mod error;
pub mod psu;
pub mod ratings;
pub mod register;

#[cfg(test)]
mod mock_serial;
