//! # CSV Stream DAQ
//!
//! An instrument driver that turns a line-oriented text stream into oscilloscope-style
//! channels. Any device that can print lines such as
//!
//! ```text
//! CSV-NAME,Vbat,Iload
//! CSV-UNIT,V,A
//! CSV-DATA,1000000000000,3.71,250m
//! ```
//!
//! over a serial port, a capture file or a pipe becomes a multi-channel source whose
//! waveforms grow one sample at a time.
//!
//! ## Crate Structure
//!
//! - **`protocol`**: Line decoding: finds the `CSV-` marker, drops any prefix noise and
//!   classifies the record.
//! - **`instrument`**: `CsvStreamInstrument`, which interprets records, queues sample sets and
//!   delivers them to its channels. Implements every trait in `capabilities`.
//! - **`pending`**: The thread-safe FIFO between the acquisition and delivery threads.
//! - **`channel`** / **`waveform`** / **`units`**: The data model.
//! - **`adapters`**: Line transports (serial port, file or stdin replay, scripted mock).
//! - **`session`**: Saving and restoring channel identities as YAML.
//! - **`config`** / **`logging`** / **`error`**: Configuration, tracing setup and the crate
//!   error type.

pub mod adapters;
pub mod capabilities;
pub mod channel;
pub mod config;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod pending;
pub mod protocol;
pub mod session;
pub mod units;
pub mod waveform;

pub use adapters::LineTransport;
pub use channel::{Channel, StreamDescriptor};
pub use error::{AppResult, DaqError};
pub use instrument::CsvStreamInstrument;
pub use units::Unit;
pub use waveform::{Waveform, WaveformKind};
