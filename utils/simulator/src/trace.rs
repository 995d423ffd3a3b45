//! Value Change Dump output for the UART signals.
//!
//! One time unit is one clock cycle. Variables are grouped in a `uart`
//! scope with `tx` and `rx` sub-scopes; after the first timestamp only
//! variables whose value changed are written.

use std::io::{self, Write};

use crate::config::ParityMode;
use crate::interface::{UartInput, UartOutput};
use crate::rx::RxState;
use crate::tx::TxState;

/// Everything recorded for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSample {
    pub input: UartInput,
    pub output: UartOutput,
    pub tx_state: TxState,
    pub rx_state: RxState,
}

struct Var {
    scope: Scope,
    name: &'static str,
    width: u32,
    id: &'static str,
    value: fn(&TraceSample) -> u64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Top,
    Tx,
    Rx,
}

const VARS: &[Var] = &[
    Var {
        scope: Scope::Top,
        name: "reset_n",
        width: 1,
        id: "!",
        value: |s| s.input.reset_n.into(),
    },
    Var {
        scope: Scope::Top,
        name: "parity_en",
        width: 1,
        id: "\"",
        value: |s| s.input.line.parity_enable.into(),
    },
    Var {
        scope: Scope::Top,
        name: "parity_odd",
        width: 1,
        id: "#",
        value: |s| u64::from(s.input.line.parity_mode == ParityMode::Odd),
    },
    Var {
        scope: Scope::Top,
        name: "stop_bits",
        width: 2,
        id: "$",
        value: |s| s.input.line.stop_bits.count().into(),
    },
    Var {
        scope: Scope::Top,
        name: "break_signal",
        width: 1,
        id: "%",
        value: |s| s.input.line.break_signal.into(),
    },
    Var {
        scope: Scope::Tx,
        name: "tx_start",
        width: 1,
        id: "&",
        value: |s| s.input.tx_start.into(),
    },
    Var {
        scope: Scope::Tx,
        name: "tx_data_in",
        width: 8,
        id: "'",
        value: |s| s.input.tx_data.into(),
    },
    Var {
        scope: Scope::Tx,
        name: "tx_serial_out",
        width: 1,
        id: "(",
        value: |s| s.output.tx_serial_out.into(),
    },
    Var {
        scope: Scope::Tx,
        name: "tx_busy",
        width: 1,
        id: ")",
        value: |s| s.output.tx_busy.into(),
    },
    Var {
        scope: Scope::Tx,
        name: "state",
        width: 3,
        id: "*",
        value: |s| s.tx_state.code().into(),
    },
    Var {
        scope: Scope::Rx,
        name: "rx_serial_in",
        width: 1,
        id: "+",
        value: |s| s.input.rx_serial_in.into(),
    },
    Var {
        scope: Scope::Rx,
        name: "rx_data_out",
        width: 8,
        id: ",",
        value: |s| s.output.rx_data.into(),
    },
    Var {
        scope: Scope::Rx,
        name: "rx_ready",
        width: 1,
        id: "-",
        value: |s| s.output.rx_ready.into(),
    },
    Var {
        scope: Scope::Rx,
        name: "parity_error",
        width: 1,
        id: ".",
        value: |s| s.output.parity_error.into(),
    },
    Var {
        scope: Scope::Rx,
        name: "frame_error",
        width: 1,
        id: "/",
        value: |s| s.output.frame_error.into(),
    },
    Var {
        scope: Scope::Rx,
        name: "state",
        width: 3,
        id: "0",
        value: |s| s.rx_state.code().into(),
    },
];

pub struct VcdWriter<W: Write> {
    out: W,
    last: Option<TraceSample>,
}

impl<W: Write> VcdWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "$version uart-sim {} $end", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "$comment one time unit per clock cycle $end")?;
        writeln!(out, "$timescale 1 ns $end")?;
        writeln!(out, "$scope module uart $end")?;
        write_vars(&mut out, Scope::Top)?;
        for (scope, name) in [(Scope::Tx, "tx"), (Scope::Rx, "rx")] {
            writeln!(out, "$scope module {name} $end")?;
            write_vars(&mut out, scope)?;
            writeln!(out, "$upscope $end")?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;
        Ok(Self { out, last: None })
    }

    pub fn dump(&mut self, cycle: u64, sample: TraceSample) -> io::Result<()> {
        let last = self.last.replace(sample);
        let changed: Vec<&Var> = VARS
            .iter()
            .filter(|var| match &last {
                Some(last) => (var.value)(last) != (var.value)(&sample),
                None => true,
            })
            .collect();
        if changed.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "#{cycle}")?;
        for var in changed {
            let value = (var.value)(&sample);
            if var.width == 1 {
                writeln!(self.out, "{}{}", value, var.id)?;
            } else {
                writeln!(self.out, "b{:b} {}", value, var.id)?;
            }
        }
        Ok(())
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn write_vars<W: Write>(out: &mut W, scope: Scope) -> io::Result<()> {
    for var in VARS.iter().filter(|var| var.scope == scope) {
        if var.width == 1 {
            writeln!(out, "$var wire 1 {} {} $end", var.id, var.name)?;
        } else {
            writeln!(
                out,
                "$var wire {} {} {} [{}:0] $end",
                var.width,
                var.id,
                var.name,
                var.width - 1
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Synchronous, Uart, UartConfig};

    #[test]
    fn header_and_changes_only() {
        let mut uart = Uart::new(&UartConfig::new(7_372_800, 115_200)).unwrap();
        let mut vcd = VcdWriter::new(Vec::new()).unwrap();
        for cycle in 0..4 {
            let input = UartInput {
                tx_start: cycle == 2,
                tx_data: 0x41,
                ..Default::default()
            };
            let output = uart.tick(input);
            vcd.dump(
                cycle,
                TraceSample {
                    input,
                    output,
                    tx_state: uart.tx().state(),
                    rx_state: uart.rx().state(),
                },
            )
            .unwrap();
        }
        let text = String::from_utf8(vcd.finish().unwrap()).unwrap();

        assert!(text.contains("$scope module tx $end"));
        assert!(text.contains("$var wire 8 ' tx_data_in [7:0] $end"));
        assert!(text.contains("$enddefinitions $end"));
        // Cycle 1 repeats cycle 0 exactly and is skipped.
        assert!(text.contains("#0\n"));
        assert!(!text.contains("#1\n"));
        assert!(text.contains("#2\n1&\n1)\nb1 *\n"));
        assert!(text.contains("#3\n0&\n"));
        assert!(text.contains("b1000001 '"));
    }
}
