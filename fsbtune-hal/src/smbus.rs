//! SMBus block-transfer adapter over `embedded-hal` I2C
//!
//! SMBus frames a block read as a command-byte write followed by a
//! count-prefixed read, and a block write as command, count, payload.
//! This module adapts any [`embedded_hal::i2c::I2c`] master to the
//! [`BlockBus`] contract using that framing.

use embedded_hal::i2c::{ErrorKind, I2c};

use crate::block::{BlockBus, TransportError};

/// Largest payload an SMBus block transfer can carry
pub const SMBUS_BLOCK_MAX: usize = 32;

/// [`BlockBus`] adapter for an `embedded-hal` I2C master
pub struct SmbusBlock<I2C> {
    i2c: I2C,
}

impl<I2C> SmbusBlock<I2C> {
    /// Wrap an I2C master
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Release the wrapped I2C master
    pub fn release(self) -> I2C {
        self.i2c
    }
}

fn map_err<E: embedded_hal::i2c::Error>(err: E) -> TransportError {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => TransportError::DeviceUnavailable,
        _ => TransportError::Io,
    }
}

impl<I2C: I2c> BlockBus for SmbusBlock<I2C> {
    fn read_block(
        &mut self,
        address: u8,
        command: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        // Count byte plus payload. The count is not known before the
        // transfer, so read up to the caller's buffer size and let the
        // device NAK the tail.
        let mut raw = [0u8; SMBUS_BLOCK_MAX + 1];
        let want = buf.len().min(SMBUS_BLOCK_MAX);
        self.i2c
            .write_read(address, &[command], &mut raw[..want + 1])
            .map_err(map_err)?;
        let reported = usize::from(raw[0]);
        let copied = reported.min(want);
        buf[..copied].copy_from_slice(&raw[1..1 + copied]);
        Ok(reported)
    }

    fn write_block(
        &mut self,
        address: u8,
        command: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if data.len() > SMBUS_BLOCK_MAX {
            return Err(TransportError::Io);
        }
        let mut raw = [0u8; SMBUS_BLOCK_MAX + 2];
        raw[0] = command;
        raw[1] = data.len() as u8;
        raw[2..2 + data.len()].copy_from_slice(data);
        self.i2c
            .write(address, &raw[..2 + data.len()])
            .map_err(map_err)
    }
}
