//! Operator attribute surface
//!
//! Portable table of the named get/set endpoints an operator front end
//! (sysfs, CLI, debug shell) exposes. Each attribute maps 1:1 onto an
//! engine operation; this layer parses and formats text and nothing
//! else. Every bounds check lives in the engine.

use core::fmt::Write as _;

use heapless::String;

use fsbtune_hal::BusProvider;

use crate::engine::{EngineError, FsbEngine};

/// Capacity of a rendered attribute value
pub const VALUE_LEN: usize = 16;

/// Rendered attribute value
pub type Value = String<VALUE_LEN>;

/// Named operator attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attr {
    /// Target chip address, hex
    I2cAddr,
    /// Bus index, decimal
    I2cAdapterId,
    /// Raw control word, 4-digit hex
    Raw,
    /// FSB frequency, decimal KHz
    FsbFreq,
    /// Step index, decimal
    PllStep,
    /// Guard unlock flag, 0/1
    PllMUnlock,
    /// Desired divisor, decimal 0-63
    PllMSet,
    /// Divisor as read from the chip, decimal, read-only
    PllMActual,
}

/// Every attribute, in presentation order
pub const ALL: [Attr; 8] = [
    Attr::I2cAddr,
    Attr::I2cAdapterId,
    Attr::Raw,
    Attr::FsbFreq,
    Attr::PllStep,
    Attr::PllMUnlock,
    Attr::PllMSet,
    Attr::PllMActual,
];

impl Attr {
    /// Name as exposed to the operator
    pub fn name(self) -> &'static str {
        match self {
            Attr::I2cAddr => "i2c_addr",
            Attr::I2cAdapterId => "i2c_adapter_id",
            Attr::Raw => "raw",
            Attr::FsbFreq => "fsb_freq",
            Attr::PllStep => "pll_step",
            Attr::PllMUnlock => "pll_m_unlock",
            Attr::PllMSet => "pll_m_set",
            Attr::PllMActual => "pll_m_actual",
        }
    }

    /// Look up an attribute by its operator-facing name
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.into_iter().find(|attr| attr.name() == name)
    }

    /// Whether the attribute accepts writes
    pub fn writable(self) -> bool {
        !matches!(self, Attr::PllMActual)
    }
}

/// Attribute-surface failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttrError {
    /// Input text does not parse in the attribute's encoding
    Parse,
    /// Attribute does not accept writes
    ReadOnly,
    /// Rendered value does not fit the output buffer
    BufferTooSmall,
    /// Engine rejected the operation
    Engine(EngineError),
}

impl From<EngineError> for AttrError {
    fn from(err: EngineError) -> Self {
        AttrError::Engine(err)
    }
}

fn render(args: core::fmt::Arguments<'_>) -> Result<Value, AttrError> {
    let mut out = Value::new();
    out.write_fmt(args).map_err(|_| AttrError::BufferTooSmall)?;
    Ok(out)
}

/// Render an attribute's current value
///
/// Attributes backed by device state perform a fresh read; configuration
/// attributes render without touching the bus.
pub fn show<P: BusProvider>(engine: &mut FsbEngine<P>, attr: Attr) -> Result<Value, AttrError> {
    match attr {
        Attr::I2cAddr => render(format_args!("0x{:02X}", engine.config().address)),
        Attr::I2cAdapterId => render(format_args!("{}", engine.config().bus_index)),
        Attr::Raw => render(format_args!("0x{:04X}", engine.snapshot()?.raw)),
        Attr::FsbFreq => match engine.snapshot()?.fsb_khz {
            Some(khz) => render(format_args!("{khz} KHz")),
            None => render(format_args!("undefined")),
        },
        Attr::PllStep => render(format_args!("{}", engine.snapshot()?.step)),
        Attr::PllMUnlock => render(format_args!("{}", engine.config().pll_m_unlock as u8)),
        Attr::PllMSet => render(format_args!("{}", engine.config().pll_m)),
        Attr::PllMActual => render(format_args!("{}", engine.snapshot()?.pll_m)),
    }
}

/// Apply operator input to a writable attribute
pub fn store<P: BusProvider>(
    engine: &mut FsbEngine<P>,
    attr: Attr,
    input: &str,
) -> Result<(), AttrError> {
    let input = input.trim();
    match attr {
        Attr::I2cAddr => {
            let address = u8::try_from(parse_hex(input)?).map_err(|_| AttrError::Parse)?;
            engine.set_address(address)?;
        }
        Attr::I2cAdapterId => engine.set_bus_index(parse_dec(input)?),
        Attr::Raw => {
            engine.set_raw(parse_hex(input)?)?;
        }
        Attr::FsbFreq => {
            engine.set_fsb_khz(parse_dec(input)?)?;
        }
        Attr::PllStep => {
            engine.set_step(parse_dec(input)?)?;
        }
        Attr::PllMUnlock => {
            let flag: u8 = parse_dec(input)?;
            engine.set_pll_m_unlock(flag != 0);
        }
        Attr::PllMSet => engine.set_pll_m(parse_dec(input)?)?,
        Attr::PllMActual => return Err(AttrError::ReadOnly),
    }
    Ok(())
}

fn parse_hex(input: &str) -> Result<u16, AttrError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u16::from_str_radix(digits, 16).map_err(|_| AttrError::Parse)
}

fn parse_dec<T: core::str::FromStr>(input: &str) -> Result<T, AttrError> {
    input.parse().map_err(|_| AttrError::Parse)
}
