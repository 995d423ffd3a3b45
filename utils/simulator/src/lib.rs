mod baud;
mod config;
mod debounce;
mod decoder;
mod error;
mod interface;
mod rx;
mod sim;
mod synchronous;
mod trace;
mod tx;
mod waveform;

// Re-export public API
pub use baud::BaudGenerator;
pub use config::{
    DebounceConfig, LineControl, ParityMode, RX_OVERSAMPLE, StopBits, TX_OVERSAMPLE, UartConfig,
};
pub use debounce::Debounce;
pub use decoder::{DecodedFrame, LineDecoder};
pub use error::{Error, Result};
pub use interface::{Uart, UartInput, UartOutput};
pub use rx::{Oversampler, Receiver, RxInput, RxOutput, RxState, SAMPLES_PER_BIT};
pub use sim::{EchoReport, RxFrame, Simulator};
pub use synchronous::{EdgeDetector, Synchronous};
pub use trace::{TraceSample, VcdWriter};
pub use tx::{Transmitter, TxInput, TxOutput, TxState};
pub use waveform::{FrameFormat, LineDriver};
