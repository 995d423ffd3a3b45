use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::Synchronous;
use crate::config::{LineControl, UartConfig};
use crate::decoder::{DecodedFrame, LineDecoder};
use crate::error::{Error, Result};
use crate::interface::{Uart, UartInput, UartOutput};
use crate::trace::{TraceSample, VcdWriter};
use crate::waveform::LineDriver;

/// A byte delivered by the receiver, with the cycle `rx_ready` was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFrame {
    pub data: u8,
    pub parity_error: bool,
    pub frame_error: bool,
    pub cycle: u64,
}

impl RxFrame {
    fn capture(output: &UartOutput, cycle: u64) -> Self {
        Self {
            data: output.rx_data,
            parity_error: output.parity_error,
            frame_error: output.frame_error,
            cycle,
        }
    }
}

/// Outcome of [`Simulator::run_echo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoReport {
    /// Frames delivered by the receiver.
    pub received: Vec<RxFrame>,
    /// Frames decoded from the transmitter line.
    pub echoed: Vec<DecodedFrame>,
}

/// Drives a [`Uart`] cycle by cycle and keeps its inputs between ticks.
pub struct Simulator {
    config: UartConfig,
    uart: Uart,
    input: UartInput,
    output: UartOutput,
    cycle: u64,
    trace: Option<VcdWriter<BufWriter<File>>>,
    monitor: Option<(LineDecoder, Vec<DecodedFrame>)>,
}

impl Simulator {
    pub fn new(config: UartConfig) -> Result<Self> {
        let uart = Uart::new(&config)?;
        let output = uart.output();
        Ok(Simulator {
            input: UartInput {
                line: config.line,
                ..Default::default()
            },
            config,
            uart,
            output,
            cycle: 0,
            trace: None,
            monitor: None,
        })
    }

    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    pub fn uart(&self) -> &Uart {
        &self.uart
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Outputs registered on the last tick.
    pub fn output(&self) -> UartOutput {
        self.output
    }

    /// Open a VCD trace; every following tick is dumped into it.
    pub fn open_vcd<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.trace = Some(VcdWriter::new(BufWriter::new(file))?);
        eprintln!("Writing VCD trace to {}", path.as_ref().display());
        Ok(())
    }

    pub fn close_vcd(&mut self) -> Result<()> {
        if let Some(trace) = self.trace.take() {
            trace.finish()?;
        }
        Ok(())
    }

    /// Decode the transmitter line alongside the simulation.
    pub fn enable_tx_monitor(&mut self) {
        let decoder = LineDecoder::new(self.bit_ticks(), self.input.line.parity());
        self.monitor = Some((decoder, Vec::new()));
        eprintln!("TX monitor enabled ({} cycles per bit)", self.bit_ticks());
    }

    /// Frames decoded by the TX monitor since the last call.
    pub fn take_monitored_frames(&mut self) -> Vec<DecodedFrame> {
        match &mut self.monitor {
            Some((_, frames)) => std::mem::take(frames),
            None => Vec::new(),
        }
    }

    /// Clock cycles per bit on the line.
    pub fn bit_ticks(&self) -> u64 {
        self.uart.tx().bit_ticks()
    }

    pub fn set_rx_line(&mut self, level: bool) {
        self.input.rx_serial_in = level;
    }

    pub fn set_line_control(&mut self, line: LineControl) {
        self.config.line = line;
        self.input.line = line;
    }

    /// Hold `reset_n` low for `cycles` ticks (at least one).
    pub fn reset(&mut self, cycles: u64) -> Result<()> {
        self.input.reset_n = false;
        self.input.tx_start = false;
        for _ in 0..cycles.max(1) {
            self.tick()?;
        }
        self.input.reset_n = true;
        Ok(())
    }

    /// Pulse `tx_start` for one tick with `byte` on `tx_data`.
    pub fn start_transmit(&mut self, byte: u8) -> Result<UartOutput> {
        self.input.tx_start = true;
        self.input.tx_data = byte;
        let output = self.tick();
        self.input.tx_start = false;
        output
    }

    pub fn tick(&mut self) -> Result<UartOutput> {
        self.output = self.uart.tick(self.input);
        if let Some(trace) = &mut self.trace {
            trace.dump(
                self.cycle,
                TraceSample {
                    input: self.input,
                    output: self.output,
                    tx_state: self.uart.tx().state(),
                    rx_state: self.uart.rx().state(),
                },
            )?;
        }
        if let Some((decoder, frames)) = &mut self.monitor {
            frames.extend(decoder.process(self.output.tx_serial_out));
        }
        self.cycle += 1;
        Ok(self.output)
    }

    /// Send `bytes` with the transmitter wired back into the receiver.
    ///
    /// Each byte is requested once the previous one has been received.
    /// `max_cycles` bounds the whole run.
    pub fn run_loopback(&mut self, bytes: &[u8], max_cycles: u64) -> Result<Vec<RxFrame>> {
        let deadline = self.cycle + max_cycles;
        let mut frames = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            self.input.rx_serial_in = self.output.tx_serial_out;
            self.start_transmit(byte)?;
            loop {
                if self.cycle >= deadline {
                    return Err(Error::Timeout(max_cycles));
                }
                self.input.rx_serial_in = self.output.tx_serial_out;
                let cycle = self.cycle;
                let output = self.tick()?;
                if output.rx_ready {
                    frames.push(RxFrame::capture(&output, cycle));
                    break;
                }
            }
        }
        Ok(frames)
    }

    /// Play `driver` into the receiver and transmit every received byte
    /// back on the following tick.
    ///
    /// Finishes once the driver is drained and the transmitter has been idle
    /// for two bit periods.
    pub fn run_echo(&mut self, driver: &mut LineDriver, max_cycles: u64) -> Result<EchoReport> {
        let bit_ticks = self.bit_ticks();
        let mut decoder = LineDecoder::new(bit_ticks, self.input.line.parity());
        let mut report = EchoReport::default();
        let mut echo = None;
        let mut quiet = 0;

        for _ in 0..max_cycles {
            self.input.rx_serial_in = driver.next_level();
            match echo.take() {
                Some(byte) => {
                    self.input.tx_start = true;
                    self.input.tx_data = byte;
                }
                None => self.input.tx_start = false,
            }

            let cycle = self.cycle;
            let output = self.tick()?;
            report.echoed.extend(decoder.process(output.tx_serial_out));
            if output.rx_ready {
                report.received.push(RxFrame::capture(&output, cycle));
                echo = Some(output.rx_data);
            }

            if driver.is_empty() && echo.is_none() && !output.tx_busy && !self.input.tx_start {
                quiet += 1;
                if quiet >= 2 * bit_ticks {
                    self.input.tx_start = false;
                    return Ok(report);
                }
            } else {
                quiet = 0;
            }
        }
        Err(Error::Timeout(max_cycles))
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if self.close_vcd().is_err() {
            eprintln!("Failed to flush VCD trace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParityMode;
    use crate::waveform::FrameFormat;

    fn even_parity() -> LineControl {
        LineControl {
            parity_enable: true,
            parity_mode: ParityMode::Even,
            ..Default::default()
        }
    }

    fn simulator() -> Simulator {
        Simulator::new(UartConfig::new(7_372_800, 115_200).with_line(even_parity())).unwrap()
    }

    #[test]
    fn loopback_delivers_bytes_in_order() {
        let mut sim = simulator();
        sim.reset(2).unwrap();
        let frames = sim.run_loopback(b"Hi!", 10_000).unwrap();
        let data: Vec<u8> = frames.iter().map(|frame| frame.data).collect();
        assert_eq!(data, b"Hi!");
        assert!(frames.iter().all(|f| !f.parity_error && !f.frame_error));
        assert!(frames.windows(2).all(|pair| pair[0].cycle < pair[1].cycle));
    }

    #[test]
    fn line_control_applies_to_next_frame() {
        let mut sim = simulator();
        sim.set_line_control(LineControl {
            parity_enable: true,
            parity_mode: ParityMode::Odd,
            ..Default::default()
        });
        assert_eq!(sim.config().line.parity(), Some(ParityMode::Odd));
        let frames = sim.run_loopback(&[0x80, 0x7f], 10_000).unwrap();
        assert_eq!(frames.iter().map(|f| f.data).collect::<Vec<_>>(), [0x80, 0x7f]);
        assert!(frames.iter().all(|f| !f.parity_error && !f.frame_error));
    }

    #[test]
    fn loopback_times_out() {
        let mut sim = simulator();
        assert!(matches!(
            sim.run_loopback(&[0x55], 100),
            Err(Error::Timeout(100))
        ));
    }

    #[test]
    fn echo_repeats_received_bytes() {
        let mut sim = simulator();
        let format = FrameFormat::from(&even_parity());
        let flipped = FrameFormat {
            flip_parity: true,
            ..format
        };
        let mut driver = LineDriver::new(sim.bit_ticks());
        driver
            .idle(100)
            .frame(0x31, &format)
            .idle(700)
            .frame(0x32, &flipped)
            .idle(700);
        let report = sim.run_echo(&mut driver, 20_000).unwrap();

        let received: Vec<(u8, bool)> = report
            .received
            .iter()
            .map(|frame| (frame.data, frame.parity_error))
            .collect();
        assert_eq!(received, [(0x31u8, false), (0x32u8, true)]);
        let echoed: Vec<u8> = report.echoed.iter().map(|frame| frame.data).collect();
        assert_eq!(echoed, [0x31, 0x32]);
        assert!(report.echoed.iter().all(|frame| !frame.parity_error));
    }

    #[test]
    fn monitor_decodes_transmitter() {
        let mut sim = simulator();
        sim.enable_tx_monitor();
        sim.start_transmit(0xa5).unwrap();
        for _ in 0..1_000 {
            sim.tick().unwrap();
        }
        let frames = sim.take_monitored_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, 0xa5);
        assert!(sim.take_monitored_frames().is_empty());
    }

    #[test]
    fn reset_restores_idle_outputs() {
        let mut sim = simulator();
        sim.start_transmit(0x00).unwrap();
        for _ in 0..200 {
            sim.tick().unwrap();
        }
        assert!(sim.output().tx_busy);
        sim.reset(0).unwrap();
        let output = sim.tick().unwrap();
        assert!(output.tx_serial_out && !output.tx_busy && !output.rx_ready);
    }

    #[test]
    fn writes_vcd() {
        let path = std::env::temp_dir().join(format!("uart-sim-{}.vcd", std::process::id()));
        let mut sim = simulator();
        sim.open_vcd(&path).unwrap();
        sim.run_loopback(&[0x7e], 10_000).unwrap();
        sim.close_vcd().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(text.starts_with("$version"));
        assert!(text.contains("b1111110 ,"));
    }
}
