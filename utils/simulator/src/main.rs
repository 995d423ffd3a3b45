use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use uart_sim::{FrameFormat, LineDriver, ParityMode, RxFrame, Simulator, StopBits, UartConfig};

#[derive(Parser)]
#[command(name = "uart-sim")]
#[command(about = "Cycle-accurate UART transmitter/receiver simulator")]
#[command(version)]
struct Args {
    /// Bytes to send
    #[arg(value_name = "MESSAGE", default_value = "Hello, UART!")]
    message: String,

    /// YAML configuration file; command line options override it
    #[arg(short, long)]
    config: Option<Utf8PathBuf>,

    /// System clock frequency in Hz
    #[arg(long)]
    clock_rate: Option<u64>,

    /// Line rate in bits per second
    #[arg(long)]
    baud_rate: Option<u64>,

    #[arg(long, value_enum)]
    parity: Option<Parity>,

    /// Stop bits per frame (1 or 2)
    #[arg(long)]
    stop_bits: Option<u8>,

    /// Debounce counter width in bits
    #[arg(long)]
    debounce: Option<u32>,

    #[arg(long, value_enum, default_value = "loopback")]
    mode: Mode,

    /// VCD output file
    #[arg(long)]
    vcd: Option<Utf8PathBuf>,

    /// Maximum simulation cycles
    #[arg(long, default_value = "10000000")]
    max_cycles: u64,

    /// Send frame N with a wrong parity bit (echo mode)
    #[arg(long, value_name = "N")]
    flip_parity: Option<usize>,

    /// Decode and print the transmitter line as it is driven
    #[arg(long)]
    monitor: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Transmitter output wired to the receiver input
    Loopback,
    /// Drive the receiver externally and send every byte back
    Echo,
}

fn build_config(args: &Args) -> Result<UartConfig> {
    let mut config = match &args.config {
        Some(path) => {
            UartConfig::load(path).with_context(|| format!("Failed to load config {path}"))?
        }
        None => UartConfig::new(7_372_800, 115_200),
    };
    if let Some(clock_rate) = args.clock_rate {
        config.clock_rate = clock_rate;
    }
    if let Some(baud_rate) = args.baud_rate {
        config.baud_rate = baud_rate;
    }
    match args.parity {
        Some(Parity::None) => config.line.parity_enable = false,
        Some(Parity::Even) => {
            config.line.parity_enable = true;
            config.line.parity_mode = ParityMode::Even;
        }
        Some(Parity::Odd) => {
            config.line.parity_enable = true;
            config.line.parity_mode = ParityMode::Odd;
        }
        None => {}
    }
    if let Some(stop_bits) = args.stop_bits {
        config.line.stop_bits = StopBits::try_from(stop_bits).map_err(anyhow::Error::msg)?;
    }
    if let Some(width) = args.debounce {
        config = config.with_debounce(width);
    }
    config.validate().context("Invalid UART configuration")?;
    Ok(config)
}

fn describe(frame: &RxFrame) -> String {
    let printable = if frame.data.is_ascii_graphic() || frame.data == b' ' {
        frame.data as char
    } else {
        '.'
    };
    let mut line = format!("{:>10}  0x{:02x} '{}'", frame.cycle, frame.data, printable);
    if frame.parity_error {
        line.push_str("  parity error");
    }
    if frame.frame_error {
        line.push_str("  frame error");
    }
    line
}

fn summary(frames: &[RxFrame]) -> String {
    let parity_errors = frames.iter().filter(|frame| frame.parity_error).count();
    let frame_errors = frames.iter().filter(|frame| frame.frame_error).count();
    format!(
        "{} frames received, {} parity errors, {} frame errors",
        frames.len(),
        parity_errors,
        frame_errors
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    let bytes = args.message.as_bytes();

    eprintln!(
        "UART at {} bps from a {} Hz clock, {} cycles per bit",
        config.baud_rate,
        config.clock_rate,
        config.bit_ticks()?
    );

    let mut sim = Simulator::new(config.clone()).context("Failed to create simulator")?;
    if let Some(path) = &args.vcd {
        sim.open_vcd(path).context("Failed to open VCD trace")?;
    }
    if args.monitor {
        sim.enable_tx_monitor();
    }
    sim.reset(2)?;

    match args.mode {
        Mode::Loopback => {
            let frames = sim
                .run_loopback(bytes, args.max_cycles)
                .context("Loopback did not complete")?;
            for frame in &frames {
                println!("{}", describe(frame));
            }
            println!("{}", summary(&frames));
            let received: Vec<u8> = frames.iter().map(|frame| frame.data).collect();
            if received != bytes {
                bail!("Loopback mismatch: sent {:02x?}, received {:02x?}", bytes, received);
            }
        }
        Mode::Echo => {
            let format = FrameFormat::from(&config.line);
            let mut driver = LineDriver::new(sim.bit_ticks());
            driver.idle(sim.bit_ticks());
            for (i, &byte) in bytes.iter().enumerate() {
                let format = FrameFormat {
                    flip_parity: args.flip_parity == Some(i),
                    ..format
                };
                driver.frame(byte, &format).idle(sim.bit_ticks());
            }
            let report = sim
                .run_echo(&mut driver, args.max_cycles)
                .context("Echo did not complete")?;
            for frame in &report.received {
                println!("{}", describe(frame));
            }
            println!("{}", summary(&report.received));
            let echoed: Vec<u8> = report.echoed.iter().map(|frame| frame.data).collect();
            println!("echoed: {}", String::from_utf8_lossy(&echoed));
        }
    }

    for frame in sim.take_monitored_frames() {
        eprintln!("TX line: 0x{:02x}", frame.data);
    }
    sim.close_vcd()?;
    eprintln!("Simulation finished after {} cycles", sim.cycle());
    Ok(())
}
