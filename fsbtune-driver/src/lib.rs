//! Control engine and attribute surface for the fsbtune PLL control stack
//!
//! The engine in this crate orchestrates guarded read-modify-write
//! transactions against the chip's register block through any
//! `fsbtune-hal` transport:
//!
//! - [`engine::FsbEngine`] - validation, divisor guard, write + verify
//! - [`attrs`] - named operator endpoints with textual encodings

#![no_std]
#![deny(unsafe_code)]

pub mod attrs;
pub mod engine;

#[cfg(test)]
pub(crate) mod testutil;

pub use attrs::{Attr, AttrError};
pub use engine::{EngineError, FsbEngine, Param};
