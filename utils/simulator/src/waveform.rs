use std::collections::VecDeque;

use crate::config::{LineControl, ParityMode, StopBits};

/// Shape of one frame produced by [`LineDriver::frame`].
///
/// Besides the regular framing this can corrupt a frame on purpose: flip the
/// parity bit, drive the stop bit low or shorten it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub parity: Option<ParityMode>,
    pub stop_bits: StopBits,
    pub flip_parity: bool,
    pub stop_level: bool,
    /// Stop-bit length in ticks; defaults to `stop_bits` whole bits.
    pub stop_ticks: Option<u64>,
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            parity: None,
            stop_bits: StopBits::One,
            flip_parity: false,
            stop_level: true,
            stop_ticks: None,
        }
    }
}

impl From<&LineControl> for FrameFormat {
    fn from(line: &LineControl) -> Self {
        Self {
            parity: line.parity(),
            stop_bits: line.stop_bits,
            ..Default::default()
        }
    }
}

/// Builds a serial line waveform one tick at a time.
#[derive(Debug, Clone)]
pub struct LineDriver {
    bit_ticks: u64,
    levels: VecDeque<bool>,
}

impl LineDriver {
    pub fn new(bit_ticks: u64) -> Self {
        Self {
            bit_ticks,
            levels: VecDeque::new(),
        }
    }

    pub fn bit_ticks(&self) -> u64 {
        self.bit_ticks
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&mut self, level: bool, ticks: u64) -> &mut Self {
        self.levels.extend((0..ticks).map(|_| level));
        self
    }

    pub fn idle(&mut self, ticks: u64) -> &mut Self {
        self.level(true, ticks)
    }

    /// Low pulse on an otherwise idle line.
    pub fn glitch(&mut self, ticks: u64) -> &mut Self {
        self.level(false, ticks)
    }

    fn bit(&mut self, level: bool) {
        self.level(level, self.bit_ticks);
    }

    pub fn frame(&mut self, byte: u8, format: &FrameFormat) -> &mut Self {
        self.bit(false);
        for bit in 0..8 {
            self.bit((byte >> bit) & 1 == 1);
        }
        if let Some(mode) = format.parity {
            self.bit(mode.parity_bit(byte) ^ format.flip_parity);
        }
        let stop_ticks = format
            .stop_ticks
            .unwrap_or(self.bit_ticks * u64::from(format.stop_bits.count()));
        self.level(format.stop_level, stop_ticks)
    }

    /// Pops the level for the next tick; a drained driver leaves the line idle.
    pub fn next_level(&mut self) -> bool {
        self.levels.pop_front().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let mut driver = LineDriver::new(2);
        let format = FrameFormat {
            parity: Some(ParityMode::Even),
            stop_bits: StopBits::Two,
            ..Default::default()
        };
        driver.frame(0b0000_0011, &format);
        let mut levels = Vec::with_capacity(driver.len());
        while !driver.is_empty() {
            levels.push(driver.next_level());
        }
        let bits: Vec<bool> = levels.chunks(2).map(|pair| pair[0]).collect();
        assert_eq!(
            bits,
            [false, true, true, false, false, false, false, false, false, false, true, true]
        );
        assert!(driver.next_level());
    }
}
