//! Control firmware core for a single-channel programmable bench power supply.
//!
//! The supply regulates a constant-voltage/constant-current output via PWM,
//! samples input/output voltage and output current through a 10-bit analog
//! front end, and is driven over a line-oriented ASCII serial protocol
//! (CR/LF terminated, one response block per request, each block closed by a
//! literal `DONE`).
//!
//! This crate contains the board-agnostic part of that firmware:
//!
//! * fixed-point conversion between raw ADC/PWM counts and milli units
//! * the configuration and calibration data model plus its persistence
//!   contract
//! * the round-robin analog sampling engine
//! * the output commit/autocommit policy
//! * the serial command interpreter
//! * the one-time pin-remap provisioning step
//! * the cooperative control loop binding it all together
//!
//! Hardware is reached exclusively through the traits in [`hal`] and through
//! [`embedded_io::Read`]/[`embedded_io::Write`] for the serial port, so the
//! whole crate is testable on a host. `no-std` builds are supported via the
//! `no-std` feature flag.

#![cfg_attr(feature = "no-std", no_std)]

pub mod command;
pub mod config;
pub mod error;
pub mod hal;
pub mod numeric;
pub mod output;
pub mod provision;
pub mod runtime;
pub mod sampling;
pub mod state;

#[cfg(test)]
mod mock_hal;
#[cfg(test)]
mod mock_serial;
