//! Scripted transport double for engine and attribute tests

use fsbtune_core::codec::layout::{BLOCK_LEN, CTRL_HI, CTRL_LO};
use fsbtune_hal::{BlockBus, TransportError};

/// In-memory register block with fault injection and call counting
pub struct MockBus {
    pub block: [u8; BLOCK_LEN],
    pub reads: usize,
    pub writes: usize,
    pub fail_read: Option<TransportError>,
    pub fail_write: Option<TransportError>,
    pub reported_len: usize,
}

impl MockBus {
    /// Filler byte for the 19 bytes around the control word
    pub const FILLER: u8 = 0xA5;

    /// Block with the given control word and filler everywhere else
    pub fn with_word(high: u8, low: u8) -> Self {
        let mut block = [Self::FILLER; BLOCK_LEN];
        block[CTRL_HI] = high;
        block[CTRL_LO] = low;
        Self {
            block,
            reads: 0,
            writes: 0,
            fail_read: None,
            fail_write: None,
            reported_len: BLOCK_LEN,
        }
    }
}

impl BlockBus for MockBus {
    fn read_block(
        &mut self,
        _address: u8,
        _command: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.reads += 1;
        if let Some(err) = self.fail_read {
            return Err(err);
        }
        buf[..BLOCK_LEN].copy_from_slice(&self.block);
        Ok(self.reported_len)
    }

    fn write_block(
        &mut self,
        _address: u8,
        _command: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.writes += 1;
        if let Some(err) = self.fail_write {
            return Err(err);
        }
        self.block.copy_from_slice(&data[..BLOCK_LEN]);
        Ok(())
    }
}
