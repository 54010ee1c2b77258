//! Operator-facing device configuration
//!
//! These values belong to the operator, not the chip: nothing here is
//! derived from a bus read, and they change only on explicit request.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::PLL_M_FSB;

/// Lowest usable 7-bit bus address
pub const ADDR_MIN: u8 = 0x03;
/// Highest usable 7-bit bus address
pub const ADDR_MAX: u8 = 0x77;
/// Factory address of the PLL on the boards this stack targets
pub const ADDR_DEFAULT: u8 = 0x69;

/// Operator-controlled device configuration
///
/// Owned by one control engine instance; independent engines carry
/// independent configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// 7-bit bus address of the PLL
    pub address: u8,
    /// Index of the bus the PLL sits on
    pub bus_index: u8,
    /// Divisor assumed by step writes and forced by frequency writes
    pub pll_m: u8,
    /// Disables the divisor-mismatch guard on step writes
    pub pll_m_unlock: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: ADDR_DEFAULT,
            bus_index: 0,
            pll_m: PLL_M_FSB,
            pll_m_unlock: false,
        }
    }
}
