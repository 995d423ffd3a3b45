use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uart_sim::{RxFrame, Simulator, UartConfig};

pub const CONFIG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/configs");
const TARGET_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../target");

/// Cycle limit per scenario, overridable through `UART_SIM_MAX_CYCLES`.
pub fn max_cycles(default: u64) -> u64 {
    std::env::var("UART_SIM_MAX_CYCLES")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn load_config(path: &Path) -> Result<UartConfig> {
    UartConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Name of a configuration file without its directory and extension.
pub fn config_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
        .with_context(|| format!("Bad config file name {}", path.display()))
}

/// Build a simulator and take it through reset.
///
/// A VCD trace is written under `target/vcd` when `UART_SIM_VCD` is set.
pub fn start_simulator(config: UartConfig, test_name: &str) -> Result<Simulator> {
    let mut simulator = Simulator::new(config).context("Failed to create simulator")?;
    if std::env::var_os("UART_SIM_VCD").is_some() {
        let vcd_dir = PathBuf::from(format!("{TARGET_PATH}/vcd"));
        std::fs::create_dir_all(&vcd_dir)?;
        let file_name = format!("{}.vcd", test_name.replace("::", "_"));
        simulator.open_vcd(vcd_dir.join(file_name))?;
    }
    simulator.reset(2)?;
    Ok(simulator)
}

/// Check that `received` carries `sent` in order with no error flags.
pub fn compare_frames(sent: &[u8], received: &[RxFrame]) -> Result<()> {
    let mut mismatches = Vec::new();

    if sent.len() != received.len() {
        mismatches.push(format!(
            "sent {} frames, received {}",
            sent.len(),
            received.len()
        ));
    }
    for (i, (&byte, frame)) in sent.iter().zip(received).enumerate() {
        if frame.data != byte {
            mismatches.push(format!(
                "frame {}: sent=0x{:02x}, received=0x{:02x} at cycle {}",
                i, byte, frame.data, frame.cycle
            ));
        }
        if frame.parity_error || frame.frame_error {
            mismatches.push(format!(
                "frame {}: parity_error={} frame_error={} at cycle {}",
                i, frame.parity_error, frame.frame_error, frame.cycle
            ));
        }
    }

    if !mismatches.is_empty() {
        anyhow::bail!("Frame mismatches:\n{}", mismatches.join("\n"));
    }

    Ok(())
}
