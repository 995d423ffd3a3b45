use crate::baud::BaudGenerator;
use crate::config::{LineControl, TX_OVERSAMPLE, UartConfig};
use crate::error::Result;
use crate::synchronous::{EdgeDetector, Synchronous};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxState {
    #[default]
    Idle,
    StartBit,
    DataBits,
    ParityBit,
    StopBit,
}

impl TxState {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Frame contents latched when a transmission starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TransmitFrame {
    data: u8,
    bit_index: u8,
    parity_enable: bool,
    parity_bit: bool,
    stop_remaining: u8,
}

impl TransmitFrame {
    fn latch(data: u8, line: &LineControl) -> Self {
        Self {
            data,
            bit_index: 0,
            parity_enable: line.parity_enable,
            parity_bit: line.parity_mode.parity_bit(data),
            stop_remaining: line.stop_bits.count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxInput {
    pub start: bool,
    pub data: u8,
    pub line: LineControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutput {
    pub serial_out: bool,
    pub busy: bool,
}

/// Transmit state machine clocked by rising edges of a 1x baud clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmitter {
    baud: BaudGenerator,
    baud_edge: EdgeDetector,
    start_edge: EdgeDetector,
    state: TxState,
    frame: TransmitFrame,
    pending: bool,
    restart: bool,
    serial_out: bool,
}

impl Transmitter {
    pub fn new(config: &UartConfig) -> Result<Self> {
        Ok(Self {
            baud: BaudGenerator::new(config, TX_OVERSAMPLE, false)?,
            baud_edge: EdgeDetector::new(false),
            start_edge: EdgeDetector::new(false),
            state: TxState::Idle,
            frame: TransmitFrame::default(),
            pending: false,
            restart: false,
            serial_out: true,
        })
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Clock cycles between bit boundaries on the line.
    pub fn bit_ticks(&self) -> u64 {
        2 * self.baud.divisor()
    }

    /// A start request arrived mid-frame and waits for the next idle period.
    pub fn pending(&self) -> bool {
        self.pending
    }

    pub fn output(&self) -> TxOutput {
        TxOutput {
            serial_out: self.serial_out,
            busy: self.state != TxState::Idle,
        }
    }
}

impl Synchronous for Transmitter {
    type Input = TxInput;
    type Output = TxOutput;

    fn reset(&mut self) {
        self.baud.reset();
        self.baud_edge.reset();
        self.start_edge.reset();
        self.state = TxState::Idle;
        self.frame = TransmitFrame::default();
        self.pending = false;
        self.restart = false;
        self.serial_out = true;
    }

    fn tick(&mut self, input: TxInput) -> TxOutput {
        let baud_clk = self.baud.tick(self.restart);
        let bit_edge = self.baud_edge.rising(baud_clk);
        let start = self.start_edge.rising(input.start);
        self.restart = false;

        if self.state == TxState::Idle {
            self.serial_out = true;
            if start || self.pending {
                self.pending = false;
                self.frame = TransmitFrame::latch(input.data, &input.line);
                self.restart = true;
                self.state = TxState::StartBit;
            }
            return self.output();
        }

        if start {
            self.pending = true;
        }
        if bit_edge {
            self.shift_out();
        }
        self.output()
    }
}

impl Transmitter {
    fn shift_out(&mut self) {
        match self.state {
            TxState::Idle => {}
            TxState::StartBit => {
                self.serial_out = false;
                self.state = TxState::DataBits;
            }
            TxState::DataBits => {
                self.serial_out = (self.frame.data >> self.frame.bit_index) & 1 == 1;
                if self.frame.bit_index == 7 {
                    self.frame.bit_index = 0;
                    self.state = if self.frame.parity_enable {
                        TxState::ParityBit
                    } else {
                        TxState::StopBit
                    };
                } else {
                    self.frame.bit_index += 1;
                }
            }
            TxState::ParityBit => {
                self.serial_out = self.frame.parity_bit;
                self.state = TxState::StopBit;
            }
            TxState::StopBit => {
                self.serial_out = true;
                self.frame.stop_remaining = self.frame.stop_remaining.saturating_sub(1);
                if self.frame.stop_remaining == 0 {
                    self.state = TxState::Idle;
                }
            }
        }
    }
}
