//! Quadrotor attitude estimation and flight control.
//!
//! The crate is split in two: this `no_std` library holds everything that
//! decides what the vehicle does (filters, estimator, PID, flight-mode state
//! machine, wire formats), and the `firmware` binary binds it to an
//! STM32F407 board through the traits in [`io`].
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod drivers;
pub mod error;
pub mod flight;
pub mod io;
pub mod state;

#[cfg(test)]
pub(crate) mod test_utils;
