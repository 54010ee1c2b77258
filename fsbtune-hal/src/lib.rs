//! Fsbtune transport abstraction layer
//!
//! This crate defines the block-transfer traits the control engine talks
//! through, so the same engine code runs against a kernel SMBus binding,
//! a microcontroller I2C peripheral, or a test double.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Control engine (fsbtune-driver)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fsbtune-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  SmbusBlock   │       │ platform bus  │
//! │ (embedded-hal)│       │ (user impl)   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`block::BlockBus`] - command-selected block read/write
//! - [`block::BusProvider`] - scoped per-operation bus acquisition

#![no_std]
#![deny(unsafe_code)]

pub mod block;
pub mod smbus;

// Re-export key types at crate root for convenience
pub use block::{BlockBus, BusProvider, FixedBus, TransportError};
pub use smbus::{SmbusBlock, SMBUS_BLOCK_MAX};
