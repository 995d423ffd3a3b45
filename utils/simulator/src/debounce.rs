use crate::Synchronous;
use crate::config::MAX_COUNTER_WIDTH;
use crate::error::{Error, Result};

/// Stability filter for the receive line.
///
/// A new input level only reaches the output once it has been held for
/// `2^counter_width` consecutive ticks. Shorter pulses are swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounce {
    threshold: u32,
    candidate: bool,
    stable: u32,
    output: bool,
}

impl Debounce {
    pub fn new(counter_width: u32) -> Result<Self> {
        if counter_width == 0 || counter_width > MAX_COUNTER_WIDTH {
            return Err(Error::CounterWidth(counter_width));
        }
        Ok(Self {
            threshold: 1 << counter_width,
            candidate: true,
            stable: 0,
            output: true,
        })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Synchronous for Debounce {
    type Input = bool;
    type Output = bool;

    fn reset(&mut self) {
        self.candidate = true;
        self.stable = 0;
        self.output = true;
    }

    fn tick(&mut self, input: bool) -> bool {
        if input != self.candidate {
            self.candidate = input;
            self.stable = 1;
        } else if self.stable < self.threshold {
            self.stable += 1;
        }
        if self.stable == self.threshold {
            self.output = self.candidate;
        }
        self.output
    }
}
