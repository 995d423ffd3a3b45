use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or driving the UART model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("baud rate must be non-zero")]
    ZeroBaudRate,

    /// The clock is too slow for the requested baud rate and oversampling
    /// factor, so the derived clock would have a zero-length half period.
    #[error(
        "baud divisor is zero: {clock_rate} Hz cannot drive {baud_rate} bps at {oversample}x oversampling"
    )]
    ZeroDivisor {
        clock_rate: u64,
        baud_rate: u64,
        oversample: u32,
    },

    #[error("debounce counter width {0} is outside 1..=24")]
    CounterWidth(u32),

    #[error("failed to read config {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("trace output failed")]
    Trace(#[from] std::io::Error),

    #[error("simulation did not finish within {0} cycles")]
    Timeout(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
