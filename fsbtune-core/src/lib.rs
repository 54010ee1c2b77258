//! Transport-agnostic core logic for the fsbtune PLL control stack
//!
//! This crate contains everything that does not touch a bus:
//!
//! - Control-word codec (decode, encode, step ⇄ frequency conversion)
//! - Write strategies that patch the control word into a register block
//! - Operator-facing device configuration
//!
//! The arithmetic mirrors the ICS9LPR363 programming model exactly,
//! truncation and all; round-trip behavior is part of the contract.

#![no_std]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;

pub use codec::{CodecError, PllSnapshot, WriteStrategy};
pub use config::DeviceConfig;
