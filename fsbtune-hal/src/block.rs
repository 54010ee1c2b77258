//! Block-transfer bus abstractions
//!
//! Provides traits for SMBus-style block transfers that can be implemented
//! by platform-specific transports.

/// Errors reported by a block transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The requested bus does not exist or cannot be opened
    BusUnavailable,
    /// No device responded at the target address
    DeviceUnavailable,
    /// The transfer started but failed mid-flight
    Io,
}

/// Command-selected block transfer master
///
/// A block transfer addresses a 7-bit device, selects a register block
/// with a command byte, and moves the whole block in one transaction.
/// Transfers are blocking and have no partial completion: either the
/// block moves or the call fails.
pub trait BlockBus {
    /// Read a command-selected block from a device
    ///
    /// # Arguments
    /// * `address` - 7-bit device address
    /// * `command` - command selector byte
    /// * `buf` - buffer receiving the block payload
    ///
    /// Returns the byte count the device reported for the block, which
    /// may differ from the number of bytes copied into `buf`.
    fn read_block(
        &mut self,
        address: u8,
        command: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Write a command-selected block to a device
    ///
    /// # Arguments
    /// * `address` - 7-bit device address
    /// * `command` - command selector byte
    /// * `data` - block payload to send
    fn write_block(&mut self, address: u8, command: u8, data: &[u8])
        -> Result<(), TransportError>;
}

impl<T: BlockBus + ?Sized> BlockBus for &mut T {
    fn read_block(
        &mut self,
        address: u8,
        command: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        T::read_block(self, address, command, buf)
    }

    fn write_block(
        &mut self,
        address: u8,
        command: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        T::write_block(self, address, command, data)
    }
}

/// Scoped access to a numbered bus
///
/// A provider hands out one bus handle per logical operation; dropping the
/// handle is the release. Callers therefore cannot leak a handle on an
/// early-return path, which replaces manual acquire/release pairing.
pub trait BusProvider {
    /// Handle type borrowed from the provider for the duration of one
    /// operation
    type Bus<'a>: BlockBus
    where
        Self: 'a;

    /// Open the bus with the given index
    ///
    /// Fails with [`TransportError::BusUnavailable`] when no such bus
    /// exists.
    fn open(&mut self, index: u8) -> Result<Self::Bus<'_>, TransportError>;
}

/// Provider for platforms with a single bus
///
/// Hands out the wrapped bus for index 0 and rejects every other index.
pub struct FixedBus<B>(pub B);

impl<B: BlockBus> BusProvider for FixedBus<B> {
    type Bus<'a>
        = &'a mut B
    where
        Self: 'a;

    fn open(&mut self, index: u8) -> Result<Self::Bus<'_>, TransportError> {
        if index != 0 {
            return Err(TransportError::BusUnavailable);
        }
        Ok(&mut self.0)
    }
}
