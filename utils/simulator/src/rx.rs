use crate::baud::BaudGenerator;
use crate::config::{LineControl, ParityMode, RX_OVERSAMPLE, UartConfig};
use crate::debounce::Debounce;
use crate::error::Result;
use crate::synchronous::{EdgeDetector, Synchronous};

/// Oversamples taken for every bit on the line.
pub const SAMPLES_PER_BIT: u8 = RX_OVERSAMPLE as u8;

/// A start bit is abandoned once this many high samples are seen...
const GLITCH_ONES: u8 = 4;
/// ...before this many samples have been taken.
const GLITCH_WINDOW: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxState {
    #[default]
    Idle,
    StartBit,
    DataBits,
    ParityBit,
    StopBit,
}

impl RxState {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Accumulates the oversamples of a single bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Oversampler {
    ones: u8,
    taken: u8,
}

impl Oversampler {
    pub fn push(&mut self, level: bool) {
        self.ones += u8::from(level);
        self.taken += 1;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn ones(&self) -> u8 {
        self.ones
    }

    pub fn taken(&self) -> u8 {
        self.taken
    }

    pub fn is_complete(&self) -> bool {
        self.taken == SAMPLES_PER_BIT
    }

    /// Vote for data and parity bits: high only on a strict majority of ones.
    pub fn majority_high(&self) -> bool {
        self.ones > SAMPLES_PER_BIT / 2
    }

    /// At most half of the samples taken so far were high. A start bit needs
    /// this to be true, a stop bit needs it to be false.
    pub fn at_most_half_high(&self) -> bool {
        self.ones <= self.taken / 2
    }

    /// Too many high samples early in the start bit for it to be real.
    pub fn start_rejected(&self) -> bool {
        self.taken < GLITCH_WINDOW && self.ones >= GLITCH_ONES
    }
}

/// Per-frame receive state, discarded whenever the receiver idles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ReceiveFrame {
    shift_register: u8,
    bit_index: u8,
    sampler: Oversampler,
    calculated_parity: bool,
    sampled_parity: bool,
    parity: Option<ParityMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxInput {
    pub serial_in: bool,
    pub line: LineControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxOutput {
    pub data: u8,
    pub ready: bool,
    pub parity_error: bool,
    pub frame_error: bool,
}

/// Receive state machine clocked by rising edges of a 16x baud clock.
///
/// A falling edge on the idle line restarts the baud clock so the sixteen
/// sampling points of every bit sit inside that bit. Each bit is resolved
/// by majority vote over its samples; the stop bit doubles as a watch for the
/// next start bit so frames may follow each other without an idle gap.
///
/// `parity_error` and `frame_error` stay set from the end of a frame until
/// the receiver next passes through [`RxState::Idle`]. `ready` is high for
/// exactly one tick per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    baud: BaudGenerator,
    sample_edge: EdgeDetector,
    debounce: Option<Debounce>,
    line_edge: EdgeDetector,
    state: RxState,
    frame: ReceiveFrame,
    restart: bool,
    data: u8,
    ready: bool,
    parity_error: bool,
    frame_error: bool,
}

impl Receiver {
    pub fn new(config: &UartConfig) -> Result<Self> {
        Ok(Self {
            baud: BaudGenerator::new(config, RX_OVERSAMPLE, false)?,
            sample_edge: EdgeDetector::new(false),
            debounce: config
                .debounce
                .map(|debounce| Debounce::new(debounce.counter_width))
                .transpose()?,
            line_edge: EdgeDetector::new(true),
            state: RxState::Idle,
            frame: ReceiveFrame::default(),
            restart: false,
            data: 0,
            ready: false,
            parity_error: false,
            frame_error: false,
        })
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn bit_index(&self) -> u8 {
        self.frame.bit_index
    }

    pub fn sampler(&self) -> Oversampler {
        self.frame.sampler
    }

    pub fn output(&self) -> RxOutput {
        RxOutput {
            data: self.data,
            ready: self.ready,
            parity_error: self.parity_error,
            frame_error: self.frame_error,
        }
    }

    fn begin_frame(&mut self, line: &LineControl) {
        self.frame = ReceiveFrame {
            parity: line.parity(),
            ..Default::default()
        };
        self.restart = true;
        self.state = RxState::StartBit;
    }

    fn finish_frame(&mut self) {
        self.frame_error = self.frame.sampler.at_most_half_high();
        self.data = self.frame.shift_register;
        self.ready = true;
    }

    fn sample_start(&mut self, level: bool) {
        let sampler = &mut self.frame.sampler;
        sampler.push(level);
        if sampler.start_rejected() {
            self.state = RxState::Idle;
        } else if sampler.is_complete() {
            self.state = if sampler.at_most_half_high() {
                RxState::DataBits
            } else {
                RxState::Idle
            };
            sampler.clear();
        }
    }

    fn sample_data(&mut self, level: bool) {
        let frame = &mut self.frame;
        frame.sampler.push(level);
        if !frame.sampler.is_complete() {
            return;
        }
        let bit = frame.sampler.majority_high();
        frame.sampler.clear();
        frame.shift_register |= u8::from(bit) << frame.bit_index;
        frame.calculated_parity ^= bit;
        if frame.bit_index < 7 {
            frame.bit_index += 1;
            return;
        }
        frame.bit_index = 0;
        self.state = if frame.parity.is_some() {
            RxState::ParityBit
        } else {
            RxState::StopBit
        };
    }

    fn sample_parity(&mut self, level: bool) {
        let frame = &mut self.frame;
        frame.sampler.push(level);
        if !frame.sampler.is_complete() {
            return;
        }
        frame.sampled_parity = frame.sampler.majority_high();
        frame.sampler.clear();
        self.parity_error = match frame.parity {
            Some(ParityMode::Even) => frame.calculated_parity != frame.sampled_parity,
            Some(ParityMode::Odd) => frame.calculated_parity == frame.sampled_parity,
            None => false,
        };
        self.state = RxState::StopBit;
    }
}

impl Synchronous for Receiver {
    type Input = RxInput;
    type Output = RxOutput;

    fn reset(&mut self) {
        self.baud.reset();
        self.sample_edge.reset();
        if let Some(debounce) = &mut self.debounce {
            debounce.reset();
        }
        self.line_edge.reset();
        self.state = RxState::Idle;
        self.frame = ReceiveFrame::default();
        self.restart = false;
        self.data = 0;
        self.ready = false;
        self.parity_error = false;
        self.frame_error = false;
    }

    fn tick(&mut self, input: RxInput) -> RxOutput {
        let level = match &mut self.debounce {
            Some(debounce) => debounce.tick(input.serial_in),
            None => input.serial_in,
        };
        let falling = self.line_edge.falling(level);
        let baud_clk = self.baud.tick(self.restart);
        let sample = self.sample_edge.rising(baud_clk);
        self.restart = false;
        self.ready = false;

        match self.state {
            RxState::Idle => {
                self.frame = ReceiveFrame::default();
                self.parity_error = false;
                self.frame_error = false;
                if falling {
                    self.begin_frame(&input.line);
                }
            }
            RxState::StartBit if sample => self.sample_start(level),
            RxState::DataBits if sample => self.sample_data(level),
            RxState::ParityBit if sample => self.sample_parity(level),
            RxState::StopBit if falling => {
                // Next start bit arrived early: judge the stop bit on the
                // samples taken so far and go straight into the new frame.
                self.finish_frame();
                self.begin_frame(&input.line);
            }
            RxState::StopBit if sample => {
                self.frame.sampler.push(level);
                if self.frame.sampler.is_complete() {
                    self.finish_frame();
                    self.state = RxState::Idle;
                }
            }
            _ => {}
        }
        self.output()
    }
}
