//! Replay transport over any buffered reader (capture files, stdin, in-memory buffers).

use crate::adapters::LineTransport;
use crate::error::{AppResult, DaqError};
use std::fs::File;
use std::io::{BufRead, BufReader, Stdin};
use std::path::Path;

/// Reads lines from a [`BufRead`] source. End of input closes the transport.
pub struct ReaderAdapter<R> {
    reader: R,
    source: String,
    lines_read: u64,
}

impl<R: BufRead> ReaderAdapter<R> {
    /// Wrap `reader`; `source` names it in log output.
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            lines_read: 0,
        }
    }

    /// Lines returned so far.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl ReaderAdapter<BufReader<File>> {
    /// Replay a capture file.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl ReaderAdapter<BufReader<Stdin>> {
    /// Read lines piped into the process.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()), "stdin")
    }
}

impl<R: BufRead + Send> LineTransport for ReaderAdapter<R> {
    fn read_reply(&mut self) -> AppResult<String> {
        let mut line = Vec::new();
        let n = self.reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(DaqError::TransportClosed);
        }
        self.lines_read += 1;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn info(&self) -> String {
        format!("ReaderAdapter({}, {} lines read)", self.source, self.lines_read)
    }
}
