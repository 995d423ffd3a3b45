use crate::config::ParityMode;

/// A frame recovered by [`LineDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    pub data: u8,
    pub parity_error: bool,
    pub frame_error: bool,
}

/// Reference decoder for a serial line, independent of the receiver model.
///
/// Protocol: 1 start bit (0), 8 data bits (LSB first), optional parity bit,
/// stop bit (1). Idle state: line is high.
///
/// The decoder times every bit from the start-bit falling edge and takes a
/// single sample in the middle of each bit period. It is used to check the
/// transmitter's waveform without going through the oversampling receiver.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    prev_level: bool,
    bit_samples: Vec<bool>,
    cycles_since_start: u64,
    in_frame: bool,
    bit_period: u64,
    parity: Option<ParityMode>,
}

impl LineDecoder {
    pub fn new(bit_period: u64, parity: Option<ParityMode>) -> Self {
        Self {
            prev_level: true,
            bit_samples: Vec::with_capacity(10),
            cycles_since_start: 0,
            in_frame: false,
            bit_period,
            parity,
        }
    }

    pub fn bit_period(&self) -> u64 {
        self.bit_period
    }

    /// Data bits, the optional parity bit and the stop bit.
    fn frame_bits(&self) -> usize {
        8 + usize::from(self.parity.is_some()) + 1
    }

    /// Process one clock cycle of the line.
    /// Returns the frame once its stop bit has been sampled.
    pub fn process(&mut self, level: bool) -> Option<DecodedFrame> {
        if !self.in_frame && self.prev_level && !level {
            self.in_frame = true;
            self.cycles_since_start = 0;
            self.bit_samples.clear();
        }
        self.prev_level = level;

        if !self.in_frame {
            return None;
        }
        self.cycles_since_start += 1;

        // Bit n (the start bit being bit 0) is sampled at (n + 0.5) periods.
        let next_bit = self.bit_samples.len() as u64 + 1;
        let sample_time = self.bit_period * next_bit + self.bit_period / 2;
        if self.cycles_since_start != sample_time {
            return None;
        }
        self.bit_samples.push(level);

        // Finish at the middle of the stop bit so that a start bit following
        // right after is caught.
        if self.bit_samples.len() < self.frame_bits() {
            return None;
        }
        self.in_frame = false;
        Some(self.decode_bits())
    }

    fn decode_bits(&self) -> DecodedFrame {
        let mut data = 0u8;
        for (i, &bit) in self.bit_samples[..8].iter().enumerate() {
            if bit {
                data |= 1 << i;
            }
        }
        let parity_error = match self.parity {
            Some(mode) => self.bit_samples[8] != mode.parity_bit(data),
            None => false,
        };
        let stop = self.bit_samples.last().copied().unwrap_or(false);
        DecodedFrame {
            data,
            parity_error,
            frame_error: !stop,
        }
    }
}
