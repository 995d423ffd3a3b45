use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Oversampling factor of the transmit baud clock.
pub const TX_OVERSAMPLE: u32 = 1;

/// Oversampling factor of the receive baud clock.
pub const RX_OVERSAMPLE: u32 = 16;

pub(crate) const MAX_COUNTER_WIDTH: u32 = 24;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParityMode {
    #[default]
    Even,
    Odd,
}

impl ParityMode {
    /// Parity bit that accompanies `byte` on the line.
    pub fn parity_bit(self, byte: u8) -> bool {
        let odd_ones = byte.count_ones() % 2 == 1;
        match self {
            ParityMode::Even => odd_ones,
            ParityMode::Odd => !odd_ones,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl StopBits {
    pub fn count(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("unsupported stop bit count {other}")),
        }
    }
}

/// Line configuration signals shared by the transmitter and the receiver.
///
/// These are inputs sampled every tick. Parity enable and mode are latched
/// by each state machine when a frame starts.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LineControl {
    pub parity_enable: bool,
    pub parity_mode: ParityMode,
    pub stop_bits: StopBits,
    /// Carried to the interface and the trace only; no logic consults it.
    pub break_signal: bool,
}

impl LineControl {
    pub fn parity(&self) -> Option<ParityMode> {
        self.parity_enable.then_some(self.parity_mode)
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DebounceConfig {
    pub counter_width: u32,
}

/// Construction-time parameters of a UART instance.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UartConfig {
    pub clock_rate: u64,
    pub baud_rate: u64,
    #[serde(default)]
    pub debounce: Option<DebounceConfig>,
    #[serde(default)]
    pub line: LineControl,
}

impl UartConfig {
    pub fn new(clock_rate: u64, baud_rate: u64) -> Self {
        Self {
            clock_rate,
            baud_rate,
            debounce: None,
            line: LineControl::default(),
        }
    }

    pub fn with_line(mut self, line: LineControl) -> Self {
        self.line = line;
        self
    }

    pub fn with_debounce(mut self, counter_width: u32) -> Self {
        self.debounce = Some(DebounceConfig { counter_width });
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: UartConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Checks every derived parameter so that a bad configuration fails here
    /// rather than producing a stalled clock later.
    pub fn validate(&self) -> Result<()> {
        self.divisor(TX_OVERSAMPLE)?;
        self.divisor(RX_OVERSAMPLE)?;
        if let Some(debounce) = self.debounce {
            if debounce.counter_width == 0 || debounce.counter_width > MAX_COUNTER_WIDTH {
                return Err(Error::CounterWidth(debounce.counter_width));
            }
        }
        Ok(())
    }

    /// Half-period, in clock ticks, of a baud clock running at `oversample`
    /// times the baud rate. Fractions are truncated.
    pub fn divisor(&self, oversample: u32) -> Result<u64> {
        if self.baud_rate == 0 {
            return Err(Error::ZeroBaudRate);
        }
        let divisor = self
            .clock_rate
            .checked_div(2 * u64::from(oversample) * self.baud_rate)
            .unwrap_or(0);
        if divisor == 0 {
            return Err(Error::ZeroDivisor {
                clock_rate: self.clock_rate,
                baud_rate: self.baud_rate,
                oversample,
            });
        }
        Ok(divisor)
    }

    /// Length of one transmitted bit in clock ticks.
    pub fn bit_ticks(&self) -> Result<u64> {
        Ok(2 * self.divisor(TX_OVERSAMPLE)?)
    }
}
