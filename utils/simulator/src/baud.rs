use crate::Synchronous;
use crate::config::UartConfig;
use crate::error::Result;

/// Divides the system clock down to a square wave at `oversample` times the
/// baud rate.
///
/// The output toggles every `divisor` ticks. Asserting `restart` puts the
/// counter back to zero and the output back to its initial polarity, which
/// lets a state machine line the derived clock up with the start of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaudGenerator {
    divisor: u64,
    oversample: u32,
    initial_polarity: bool,
    counter: u64,
    phase: bool,
}

impl BaudGenerator {
    pub fn new(config: &UartConfig, oversample: u32, initial_polarity: bool) -> Result<Self> {
        let divisor = config.divisor(oversample)?;
        Ok(Self {
            divisor,
            oversample,
            initial_polarity,
            counter: 0,
            phase: initial_polarity,
        })
    }

    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    pub fn oversample(&self) -> u32 {
        self.oversample
    }

    pub fn phase(&self) -> bool {
        self.phase
    }
}

impl Synchronous for BaudGenerator {
    /// Restart request.
    type Input = bool;
    /// Baud clock level.
    type Output = bool;

    fn reset(&mut self) {
        self.counter = 0;
        self.phase = self.initial_polarity;
    }

    fn tick(&mut self, restart: bool) -> bool {
        if restart {
            self.reset();
        } else if self.counter == self.divisor - 1 {
            self.counter = 0;
            self.phase = !self.phase;
        } else {
            self.counter += 1;
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RX_OVERSAMPLE;

    fn generator(divisor: u64) -> BaudGenerator {
        // 16x oversampling of 1 bps needs 32 ticks per cycle of `divisor` 1.
        let config = UartConfig::new(32 * divisor, 1);
        BaudGenerator::new(&config, RX_OVERSAMPLE, false).unwrap()
    }

    #[test]
    fn toggles_every_divisor_ticks() {
        let mut baud = generator(3);
        assert_eq!(baud.divisor(), 3);
        assert_eq!(baud.oversample(), RX_OVERSAMPLE);
        let wave: Vec<bool> = (0..12).map(|_| baud.tick(false)).collect();
        assert_eq!(
            wave,
            [false, false, true, true, true, false, false, false, true, true, true, false]
        );
    }

    #[test]
    fn divisor_of_one_toggles_every_tick() {
        let mut baud = generator(1);
        let wave: Vec<bool> = (0..4).map(|_| baud.tick(false)).collect();
        assert_eq!(wave, [true, false, true, false]);
    }

    #[test]
    fn restart_rephases() {
        let mut baud = generator(4);
        for _ in 0..6 {
            baud.tick(false);
        }
        assert!(baud.phase());
        assert!(!baud.tick(true));
        // Four ticks after the restart the output rises again.
        let wave: Vec<bool> = (0..4).map(|_| baud.tick(false)).collect();
        assert_eq!(wave, [false, false, false, true]);
    }
}
