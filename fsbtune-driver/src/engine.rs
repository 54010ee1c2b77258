//! Guarded read-modify-write engine for the PLL control word
//!
//! Every operation is one self-contained transaction: open the bus,
//! perform the block transfer(s), release on every exit path. Input
//! validation happens before the first transfer, the divisor guard is
//! checked before the write, and every successful write is verified by
//! a follow-up read rather than trusted blindly.

use fsbtune_core::codec::{
    self, layout, CodecError, PllSnapshot, WriteStrategy, FSB_MAX_KHZ, FSB_MIN_KHZ, PLL_M_FSB,
    PLL_M_MASK, STEP_MAX,
};
use fsbtune_core::config::{DeviceConfig, ADDR_MAX, ADDR_MIN};
use fsbtune_hal::{BlockBus, BusProvider, TransportError, SMBUS_BLOCK_MAX};

/// Which input failed range validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Param {
    /// Bus address outside 0x03-0x77
    Address,
    /// Step index outside 0-767
    Step,
    /// Frequency outside 94500-369000 KHz
    Frequency,
    /// Divisor outside 0-63
    Divisor,
}

/// Errors reported by engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// Transport-level failure
    Bus(TransportError),
    /// The chip returned bytes the codec cannot interpret
    Codec(CodecError),
    /// Input rejected before any bus access
    OutOfRange(Param),
    /// Step write blocked: the chip's divisor disagrees with the
    /// configured one and the guard is locked
    GuardRejected {
        /// Divisor the configuration assumes
        desired: u8,
        /// Divisor the chip actually reported
        actual: u8,
    },
    /// Device reported a block length other than the chip's layout
    ShortRead {
        /// Reported length
        len: usize,
    },
}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        EngineError::Bus(err)
    }
}

impl From<CodecError> for EngineError {
    fn from(err: CodecError) -> Self {
        EngineError::Codec(err)
    }
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            EngineError::Bus(TransportError::BusUnavailable) => write!(f, "bus unavailable"),
            EngineError::Bus(TransportError::DeviceUnavailable) => {
                write!(f, "no response from device")
            }
            EngineError::Bus(TransportError::Io) => write!(f, "block transfer failed"),
            EngineError::Codec(CodecError::InvalidEncoding { high }) => {
                write!(f, "unexpected control byte 0x{high:02X}, wrong device?")
            }
            EngineError::Codec(CodecError::BlockTooShort { len }) => {
                write!(f, "register block truncated at {len} bytes")
            }
            EngineError::OutOfRange(param) => {
                let what = match param {
                    Param::Address => "bus address",
                    Param::Step => "step index",
                    Param::Frequency => "FSB frequency",
                    Param::Divisor => "divisor",
                };
                write!(f, "{what} out of range")
            }
            EngineError::GuardRejected { desired, actual } => {
                write!(f, "divisor mismatch ({desired} != {actual}), write aborted")
            }
            EngineError::ShortRead { len } => write!(f, "device returned a {len}-byte block"),
        }
    }
}

/// Control engine for one PLL device
///
/// Owns the operator configuration and a bus provider. Taking `&mut self`
/// on every operation keeps transactions serialized within one engine;
/// callers sharing an engine across threads put a mutex around it, and
/// the lock scope is then exactly one transaction.
pub struct FsbEngine<P> {
    provider: P,
    config: DeviceConfig,
}

impl<P: BusProvider> FsbEngine<P> {
    /// Create an engine with the default configuration
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, DeviceConfig::default())
    }

    /// Create an engine with an explicit configuration
    pub fn with_config(provider: P, config: DeviceConfig) -> Self {
        Self { provider, config }
    }

    /// Current operator configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Release the bus provider
    pub fn release(self) -> P {
        self.provider
    }

    /// Set the device address, validated to the usable 7-bit range
    pub fn set_address(&mut self, address: u8) -> Result<(), EngineError> {
        if !(ADDR_MIN..=ADDR_MAX).contains(&address) {
            return Err(EngineError::OutOfRange(Param::Address));
        }
        self.config.address = address;
        Ok(())
    }

    /// Select the bus the device sits on
    ///
    /// Whether the index exists is the provider's call, made when the
    /// next operation opens the bus.
    pub fn set_bus_index(&mut self, index: u8) {
        self.config.bus_index = index;
    }

    /// Set the divisor assumed by step writes
    pub fn set_pll_m(&mut self, pll_m: u8) -> Result<(), EngineError> {
        if pll_m > PLL_M_MASK {
            return Err(EngineError::OutOfRange(Param::Divisor));
        }
        self.config.pll_m = pll_m;
        Ok(())
    }

    /// Enable or disable the divisor-mismatch guard
    pub fn set_pll_m_unlock(&mut self, unlock: bool) {
        self.config.pll_m_unlock = unlock;
    }

    /// Read and decode the current device state
    pub fn snapshot(&mut self) -> Result<PllSnapshot, EngineError> {
        let mut bus = self.provider.open(self.config.bus_index)?;
        let block = read_block(&mut bus, self.config.address)?;
        let snapshot = codec::decode_block(&block)?;
        #[cfg(feature = "defmt")]
        if snapshot.fsb_khz.is_none() {
            defmt::info!(
                "divisor {=u8} is not 8, FSB frequency undefined",
                snapshot.pll_m
            );
        }
        Ok(snapshot)
    }

    /// Program a step index, guard enforced
    ///
    /// Reads the chip first and refuses to write while its divisor
    /// disagrees with the configured one, unless the operator has
    /// unlocked the guard.
    pub fn set_step(&mut self, step: u16) -> Result<PllSnapshot, EngineError> {
        if step > STEP_MAX {
            return Err(EngineError::OutOfRange(Param::Step));
        }
        let current = self.snapshot()?;
        if !self.config.pll_m_unlock && current.pll_m != self.config.pll_m {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "divisor mismatch ({=u8} != {=u8}), step write aborted; set pll_m_unlock if intended",
                self.config.pll_m,
                current.pll_m
            );
            return Err(EngineError::GuardRejected {
                desired: self.config.pll_m,
                actual: current.pll_m,
            });
        }
        self.write_word(WriteStrategy::ByStep {
            step,
            pll_m: self.config.pll_m,
        })?;
        self.snapshot()
    }

    /// Program a target FSB frequency in KHz
    ///
    /// The step-frequency mapping exists only for divisor 8, so the
    /// configured divisor is forced to 8 and the guard does not apply:
    /// a frequency request is an unconditional assertion of intent.
    pub fn set_fsb_khz(&mut self, khz: u32) -> Result<PllSnapshot, EngineError> {
        if !(FSB_MIN_KHZ..=FSB_MAX_KHZ).contains(&khz) {
            return Err(EngineError::OutOfRange(Param::Frequency));
        }
        if self.config.pll_m != PLL_M_FSB {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "divisor {=u8} has no frequency mapping, forcing 8",
                self.config.pll_m
            );
            self.config.pll_m = PLL_M_FSB;
        }
        let step = codec::khz_to_step(khz);
        self.write_word(WriteStrategy::ByStep {
            step,
            pll_m: PLL_M_FSB,
        })?;
        self.snapshot()
    }

    /// Program the raw 16-bit control word verbatim
    ///
    /// No guard and no divisor reasoning: raw mode asserts full
    /// knowledge of the bit layout.
    pub fn set_raw(&mut self, word: u16) -> Result<PllSnapshot, EngineError> {
        self.write_word(WriteStrategy::Raw(word))?;
        self.snapshot()
    }

    /// One read-modify-write transaction against the register block
    fn write_word(&mut self, strategy: WriteStrategy) -> Result<(), EngineError> {
        let mut bus = self.provider.open(self.config.bus_index)?;
        let mut block = read_block(&mut bus, self.config.address)?;
        strategy.apply(&mut block)?;
        bus.write_block(self.config.address, layout::BLOCK_CMD, &block)?;
        Ok(())
    }
}

/// Block read with the reported length checked against the chip layout
fn read_block<B: BlockBus>(
    bus: &mut B,
    address: u8,
) -> Result<[u8; layout::BLOCK_LEN], EngineError> {
    let mut buf = [0u8; SMBUS_BLOCK_MAX];
    let len = bus.read_block(address, layout::BLOCK_CMD, &mut buf)?;
    if len != layout::BLOCK_LEN {
        return Err(EngineError::ShortRead { len });
    }
    let mut block = [0u8; layout::BLOCK_LEN];
    block.copy_from_slice(&buf[..layout::BLOCK_LEN]);
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockBus;
    use fsbtune_core::codec::layout::{BLOCK_LEN, CTRL_HI, CTRL_LO};
    use fsbtune_hal::FixedBus;

    fn engine_with_word(high: u8, low: u8) -> FsbEngine<FixedBus<MockBus>> {
        FsbEngine::new(FixedBus(MockBus::with_word(high, low)))
    }

    #[test]
    fn snapshot_decodes_device_state() {
        let mut engine = engine_with_word(0x48, 0x26);
        let snap = engine.snapshot().unwrap();

        assert_eq!(snap.step, 294);
        assert_eq!(snap.raw, 0x4826);
        assert_eq!(snap.pll_m, 8);
        assert_eq!(snap.fsb_khz, Some(199_693));
    }

    #[test]
    fn snapshot_flags_undefined_divisor() {
        let mut engine = engine_with_word(0x4A, 0x08);
        let snap = engine.snapshot().unwrap();

        assert_eq!(snap.step, 264);
        assert_eq!(snap.pll_m, 10);
        assert_eq!(snap.fsb_khz, None);
    }

    #[test]
    fn snapshot_rejects_invalid_encoding() {
        let mut engine = engine_with_word(0x00, 0x26);
        assert_eq!(
            engine.snapshot(),
            Err(EngineError::Codec(CodecError::InvalidEncoding {
                high: 0x00
            }))
        );
    }

    #[test]
    fn set_step_preserves_rest_of_block() {
        let mut engine = engine_with_word(0x48, 0x00);
        let snap = engine.set_step(294).unwrap();
        assert_eq!(snap.step, 294);

        let bus = engine.release().0;
        assert_eq!(bus.block[CTRL_HI], 0x48);
        assert_eq!(bus.block[CTRL_LO], 0x26);
        for offset in (0..BLOCK_LEN).filter(|&o| o != CTRL_HI && o != CTRL_LO) {
            assert_eq!(bus.block[offset], MockBus::FILLER, "offset {offset} changed");
        }
        // guard read, read-modify-write read, verify read
        assert_eq!(bus.reads, 3);
        assert_eq!(bus.writes, 1);
    }

    #[test]
    fn set_step_rejects_out_of_range_before_bus_access() {
        let mut engine = engine_with_word(0x48, 0x00);
        assert_eq!(
            engine.set_step(768),
            Err(EngineError::OutOfRange(Param::Step))
        );

        let bus = engine.release().0;
        assert_eq!(bus.reads, 0);
        assert_eq!(bus.writes, 0);
    }

    #[test]
    fn guard_blocks_divisor_mismatch() {
        let mut engine = engine_with_word(0x4A, 0x08);
        assert_eq!(
            engine.set_step(100),
            Err(EngineError::GuardRejected {
                desired: 8,
                actual: 10
            })
        );

        let bus = engine.release().0;
        assert_eq!(bus.writes, 0);
    }

    #[test]
    fn unlock_bypasses_guard() {
        let mut engine = engine_with_word(0x4A, 0x08);
        engine.set_pll_m_unlock(true);

        let snap = engine.set_step(100).unwrap();
        assert_eq!(snap.step, 100);
        assert_eq!(snap.pll_m, 8);

        let bus = engine.release().0;
        assert_eq!(bus.writes, 1);
    }

    #[test]
    fn matching_divisor_passes_guard() {
        let mut engine = engine_with_word(0x4A, 0x08);
        engine.set_pll_m(10).unwrap();

        let snap = engine.set_step(100).unwrap();
        assert_eq!(snap.step, 100);
        assert_eq!(snap.pll_m, 10);
        assert_eq!(snap.fsb_khz, None);
    }

    #[test]
    fn set_fsb_programs_quantized_step() {
        let mut engine = engine_with_word(0x48, 0x00);
        let snap = engine.set_fsb_khz(200_000).unwrap();

        assert_eq!(snap.step, 294);
        assert_eq!(snap.fsb_khz, Some(199_693));

        let bus = engine.release().0;
        assert_eq!(bus.block[CTRL_HI], 0x48);
        assert_eq!(bus.block[CTRL_LO], 0x26);
    }

    #[test]
    fn set_fsb_forces_divisor_8_and_skips_guard() {
        // Chip reports divisor 10; a frequency write goes through anyway
        let mut engine = engine_with_word(0x4A, 0x08);
        engine.set_pll_m(10).unwrap();

        let snap = engine.set_fsb_khz(200_000).unwrap();
        assert_eq!(engine.config().pll_m, 8);
        assert_eq!(snap.pll_m, 8);
        assert_eq!(snap.fsb_khz, Some(199_693));
    }

    #[test]
    fn set_fsb_validates_range() {
        let mut engine = engine_with_word(0x48, 0x00);
        assert_eq!(
            engine.set_fsb_khz(94_499),
            Err(EngineError::OutOfRange(Param::Frequency))
        );
        assert_eq!(
            engine.set_fsb_khz(369_001),
            Err(EngineError::OutOfRange(Param::Frequency))
        );

        let bus = engine.release().0;
        assert_eq!(bus.reads, 0);
    }

    #[test]
    fn set_raw_writes_verbatim_and_rereads() {
        let mut engine = engine_with_word(0x48, 0x26);
        let snap = engine.set_raw(0xC848).unwrap();

        assert_eq!(snap.raw, 0xC848);
        assert_eq!(snap.step, 0x48 + 0x200);
        assert_eq!(snap.pll_m, 8);

        let bus = engine.release().0;
        // read-modify-write read plus verify read, no guard read
        assert_eq!(bus.reads, 2);
        assert_eq!(bus.writes, 1);
    }

    #[test]
    fn address_and_divisor_validation() {
        let mut engine = engine_with_word(0x48, 0x00);

        assert_eq!(
            engine.set_address(0x02),
            Err(EngineError::OutOfRange(Param::Address))
        );
        assert_eq!(
            engine.set_address(0x78),
            Err(EngineError::OutOfRange(Param::Address))
        );
        engine.set_address(0x71).unwrap();
        assert_eq!(engine.config().address, 0x71);

        assert_eq!(
            engine.set_pll_m(64),
            Err(EngineError::OutOfRange(Param::Divisor))
        );
        engine.set_pll_m(63).unwrap();
    }

    #[test]
    fn read_failure_aborts_before_write() {
        let mut bus = MockBus::with_word(0x48, 0x00);
        bus.fail_read = Some(TransportError::DeviceUnavailable);
        let mut engine = FsbEngine::new(FixedBus(bus));

        assert_eq!(
            engine.set_step(100),
            Err(EngineError::Bus(TransportError::DeviceUnavailable))
        );

        let bus = engine.release().0;
        assert_eq!(bus.writes, 0);
    }

    #[test]
    fn write_failure_surfaces_as_bus_error() {
        let mut bus = MockBus::with_word(0x48, 0x00);
        bus.fail_write = Some(TransportError::Io);
        let mut engine = FsbEngine::new(FixedBus(bus));

        assert_eq!(
            engine.set_step(100),
            Err(EngineError::Bus(TransportError::Io))
        );
    }

    #[test]
    fn short_block_read_is_rejected() {
        let mut bus = MockBus::with_word(0x48, 0x00);
        bus.reported_len = 3;
        let mut engine = FsbEngine::new(FixedBus(bus));

        assert_eq!(engine.snapshot(), Err(EngineError::ShortRead { len: 3 }));
        assert_eq!(
            engine.set_step(100),
            Err(EngineError::ShortRead { len: 3 })
        );

        let bus = engine.release().0;
        assert_eq!(bus.writes, 0);
    }

    #[test]
    fn missing_bus_index_is_rejected() {
        let mut engine = engine_with_word(0x48, 0x00);
        engine.set_bus_index(1);

        assert_eq!(
            engine.snapshot(),
            Err(EngineError::Bus(TransportError::BusUnavailable))
        );
    }
}
