//! Control-word codec for the ICS9LPR363 PLL family
//!
//! The chip exposes one 16-bit control word inside its register block.
//! The high byte carries a step-multiplier selector in the top two bits
//! and the divisor ("M") in the low six; the low byte is the low eight
//! bits of the step index. Three multiplier patterns are valid, the
//! fourth (`00`) means the bytes did not come from this chip family.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Register block layout
pub mod layout {
    /// Command selector for the full register block
    pub const BLOCK_CMD: u8 = 0x00;
    /// Register block length in bytes
    pub const BLOCK_LEN: usize = 21;
    /// Block offset of the control-word high byte
    pub const CTRL_HI: usize = 0x0B;
    /// Block offset of the control-word low byte
    pub const CTRL_LO: usize = 0x0C;
}

/// Lowest FSB frequency the chip can produce, in KHz
pub const FSB_MIN_KHZ: u32 = 94_500;
/// Highest FSB frequency the chip can produce, in KHz
pub const FSB_MAX_KHZ: u32 = 369_000;
/// Highest valid step index
pub const STEP_MAX: u16 = 0x2FF;
/// Divisor value for which the step-frequency mapping is defined
pub const PLL_M_FSB: u8 = 8;
/// Mask of the divisor field in the control-word high byte
pub const PLL_M_MASK: u8 = 0x3F;

/// Errors from control-word decoding and block patching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// High-byte multiplier pattern is not one of the three valid forms
    /// (wrong device at the address, or noise on the bus)
    InvalidEncoding {
        /// The offending high byte
        high: u8,
    },
    /// Register block shorter than the chip's layout
    BlockTooShort {
        /// Actual block length
        len: usize,
    },
}

/// Decoded state of the PLL control word
///
/// Produced fresh by every successful read and never updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PllSnapshot {
    /// Frequency step index, 0-767
    pub step: u16,
    /// Raw 16-bit control word as read
    pub raw: u16,
    /// Divisor field as configured in the chip
    pub pll_m: u8,
    /// FSB frequency in KHz; `None` when the divisor is not 8 and the
    /// step-frequency mapping therefore does not apply
    pub fsb_khz: Option<u32>,
}

/// Convert a step index to the FSB frequency it selects, in KHz
///
/// One step is ~357.89 Hz; the division truncates, matching the chip's
/// programming reference.
pub fn step_to_khz(step: u16) -> u32 {
    u32::from(step) * 3578 / 10 + FSB_MIN_KHZ
}

/// Convert a target FSB frequency in KHz to the step index programming it
///
/// Applies the +2 KHz compensation from the programming reference before
/// the truncating division, then clamps into the valid step range.
pub fn khz_to_step(khz: u32) -> u16 {
    let adjusted = khz.saturating_add(2);
    let step = adjusted.saturating_sub(FSB_MIN_KHZ) * 10 / 3578;
    step.min(u32::from(STEP_MAX)) as u16
}

/// Decode the two control bytes into a snapshot
pub fn decode_word(high: u8, low: u8) -> Result<PllSnapshot, CodecError> {
    let mult: u16 = match high & 0xC0 {
        0x80 => 0,
        0x40 => 1,
        0xC0 => 2,
        _ => return Err(CodecError::InvalidEncoding { high }),
    };
    let step = u16::from(low) + 0x100 * mult;
    let pll_m = high & PLL_M_MASK;
    let fsb_khz = (pll_m == PLL_M_FSB).then(|| step_to_khz(step));
    Ok(PllSnapshot {
        step,
        raw: u16::from_be_bytes([high, low]),
        pll_m,
        fsb_khz,
    })
}

/// Decode the control word out of a full register block
pub fn decode_block(block: &[u8]) -> Result<PllSnapshot, CodecError> {
    if block.len() < layout::BLOCK_LEN {
        return Err(CodecError::BlockTooShort { len: block.len() });
    }
    decode_word(block[layout::CTRL_HI], block[layout::CTRL_LO])
}

/// Encode a step index and divisor into the two control bytes
///
/// The multiplier pattern is chosen from the step's magnitude; the low
/// six bits of the high byte carry the divisor.
pub fn encode_step(step: u16, pll_m: u8) -> (u8, u8) {
    let pattern: u8 = if step > 0x1FF {
        0xC0
    } else if step > 0xFF {
        0x40
    } else {
        0x80
    };
    (pattern | (pll_m & PLL_M_MASK), (step & 0xFF) as u8)
}

/// Split a raw 16-bit control word into the two control bytes
///
/// Raw mode is intentionally unchecked: the caller asserts full knowledge
/// of the bit layout, including patterns the decoder would reject.
pub fn encode_raw(word: u16) -> (u8, u8) {
    ((word >> 8) as u8, (word & 0xFF) as u8)
}

/// How a write patches the control word into the register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteStrategy {
    /// Encode a step index together with the desired divisor
    ByStep {
        /// Step index, 0-767
        step: u16,
        /// Divisor to program alongside the step
        pll_m: u8,
    },
    /// Write a full 16-bit word verbatim, bypassing divisor reasoning
    Raw(u16),
}

impl WriteStrategy {
    /// Patch the control bytes into `block`, leaving every other byte
    /// untouched
    pub fn apply(&self, block: &mut [u8]) -> Result<(), CodecError> {
        if block.len() < layout::BLOCK_LEN {
            return Err(CodecError::BlockTooShort { len: block.len() });
        }
        let (high, low) = match *self {
            WriteStrategy::ByStep { step, pll_m } => encode_step(step, pll_m),
            WriteStrategy::Raw(word) => encode_raw(word),
        };
        block[layout::CTRL_HI] = high;
        block[layout::CTRL_LO] = low;
        Ok(())
    }
}


#[cfg(test)]
mod props {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn raw_words_with_valid_multiplier_roundtrip(word in 0u16..=u16::MAX) {
            prop_assume!(word & 0xC000 != 0);
            let (high, low) = encode_raw(word);
            let snap = decode_word(high, low).unwrap();
            prop_assert_eq!(snap.raw, word);
            prop_assert_eq!(snap.pll_m, (word >> 8) as u8 & PLL_M_MASK);
        }

        #[test]
        fn quantization_stays_within_one_step(khz in FSB_MIN_KHZ..=FSB_MAX_KHZ) {
            let back = step_to_khz(khz_to_step(khz));
            let diff = back.abs_diff(khz);
            prop_assert!(diff <= 358, "{khz} KHz came back as {back} KHz");
        }

        #[test]
        fn decode_never_exceeds_step_range(high in 0u8..=0xFF, low in 0u8..=0xFF) {
            if let Ok(snap) = decode_word(high, low) {
                prop_assert!(snap.step <= STEP_MAX);
            }
        }
    }
}
