//! Line transports.
//!
//! The driver consumes its input one text line at a time through [`LineTransport`]. The
//! transport decides how lines arrive (serial port, file replay, scripted mock); the driver
//! only sees complete lines.

use crate::error::AppResult;

/// Scripted transport for tests
pub mod mock_adapter;
pub use mock_adapter::MockLineAdapter;

/// File and stdin replay
pub mod reader_adapter;
pub use reader_adapter::ReaderAdapter;

/// Serial port reader
pub mod serial_adapter;
pub use serial_adapter::SerialAdapter;

/// Source of newline-delimited text.
pub trait LineTransport: Send {
    /// Pull the next line.
    ///
    /// Returns an empty string when no complete line is available yet. An `Err` means the
    /// transport can never produce more data and acquisition should stop.
    fn read_reply(&mut self) -> AppResult<String>;

    /// Human readable description for logs.
    fn info(&self) -> String;
}

/// Split the first `delimiter`-terminated line off the front of `buffer`.
///
/// Bytes after the delimiter stay in `buffer` for the next call. Invalid UTF-8 is replaced
/// rather than rejected since the line is about to be searched for an ASCII marker anyway.
pub(crate) fn take_line(buffer: &mut Vec<u8>, delimiter: u8) -> Option<String> {
    let end = buffer.iter().position(|&b| b == delimiter)?;
    let rest = buffer.split_off(end + 1);
    let line = std::mem::replace(buffer, rest);
    Some(String::from_utf8_lossy(&line[..end]).into_owned())
}
