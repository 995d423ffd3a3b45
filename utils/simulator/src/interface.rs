use crate::Synchronous;
use crate::config::{LineControl, UartConfig};
use crate::error::Result;
use crate::rx::{Receiver, RxInput};
use crate::tx::{Transmitter, TxInput};

/// Signals driven into the UART during one clock cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartInput {
    /// Active low.
    pub reset_n: bool,
    pub tx_start: bool,
    pub tx_data: u8,
    pub rx_serial_in: bool,
    pub line: LineControl,
}

impl Default for UartInput {
    fn default() -> Self {
        Self {
            reset_n: true,
            tx_start: false,
            tx_data: 0,
            rx_serial_in: true,
            line: LineControl::default(),
        }
    }
}

/// Registered UART outputs after a clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartOutput {
    pub tx_serial_out: bool,
    pub tx_busy: bool,
    pub rx_data: u8,
    pub rx_ready: bool,
    pub parity_error: bool,
    pub frame_error: bool,
}

/// Transmitter and receiver sharing one set of line controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uart {
    tx: Transmitter,
    rx: Receiver,
}

impl Uart {
    pub fn new(config: &UartConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tx: Transmitter::new(config)?,
            rx: Receiver::new(config)?,
        })
    }

    pub fn tx(&self) -> &Transmitter {
        &self.tx
    }

    pub fn rx(&self) -> &Receiver {
        &self.rx
    }

    pub fn output(&self) -> UartOutput {
        let tx = self.tx.output();
        let rx = self.rx.output();
        UartOutput {
            tx_serial_out: tx.serial_out,
            tx_busy: tx.busy,
            rx_data: rx.data,
            rx_ready: rx.ready,
            parity_error: rx.parity_error,
            frame_error: rx.frame_error,
        }
    }
}

impl Synchronous for Uart {
    type Input = UartInput;
    type Output = UartOutput;

    fn reset(&mut self) {
        self.tx.reset();
        self.rx.reset();
    }

    fn tick(&mut self, input: UartInput) -> UartOutput {
        if !input.reset_n {
            self.reset();
            return self.output();
        }
        self.tx.tick(TxInput {
            start: input.tx_start,
            data: input.tx_data,
            line: input.line,
        });
        self.rx.tick(RxInput {
            serial_in: input.rx_serial_in,
            line: input.line,
        });
        self.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rx::RxState;
    use crate::tx::TxState;

    #[test]
    fn reset_dominates_inputs() {
        let config = UartConfig::new(7_372_800, 115_200).with_debounce(1);
        let mut uart = Uart::new(&config).unwrap();
        let mut input = UartInput {
            tx_start: true,
            tx_data: 0x5a,
            ..Default::default()
        };
        for tick in 0..300 {
            input.rx_serial_in = uart.output().tx_serial_out;
            input.tx_start = tick % 90 == 0;
            uart.tick(input);
        }
        assert_eq!(uart.tx().state(), TxState::DataBits);
        assert_ne!(uart.rx().state(), RxState::Idle);

        for hold in 1..3 {
            let mut held = uart.clone();
            for _ in 0..hold {
                held.tick(UartInput {
                    reset_n: false,
                    ..input
                });
            }
            assert_eq!(held, Uart::new(&config).unwrap());
        }
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(Uart::new(&UartConfig::new(100, 9600)).is_err());
        assert!(Uart::new(&UartConfig::new(7_372_800, 115_200).with_debounce(40)).is_err());
    }
}
