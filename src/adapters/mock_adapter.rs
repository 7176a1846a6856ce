//! Mock line transport for testing
//!
//! Lets tests drive the driver without hardware. It provides:
//! - A scripted line queue that can be fed while the driver is running
//! - Controllable failure injection
//! - Call logging for test verification

use crate::adapters::LineTransport;
use crate::error::{AppResult, DaqError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MockState {
    lines: Mutex<VecDeque<String>>,
    closed: AtomicBool,
    should_fail_next: AtomicBool,
    call_log: Mutex<Vec<String>>,
}

/// Scripted transport; clones share the same script.
///
/// An exhausted script reads as idle (empty line) until [`MockLineAdapter::close`] is called.
///
/// # Example
///
/// ```
/// use csv_stream_daq::adapters::{LineTransport, MockLineAdapter};
///
/// let mut adapter = MockLineAdapter::new();
/// let feeder = adapter.clone();
/// feeder.push_line("CSV-DATA,0,1.0");
/// assert_eq!(adapter.read_reply().unwrap(), "CSV-DATA,0,1.0");
/// assert_eq!(adapter.read_reply().unwrap(), "");
/// ```
#[derive(Clone, Default)]
pub struct MockLineAdapter {
    state: Arc<MockState>,
}

impl MockLineAdapter {
    /// Adapter with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter pre-loaded with `lines`.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let adapter = Self::new();
        adapter.push_lines(lines);
        adapter
    }

    /// Queue one line behind whatever is already scripted.
    pub fn push_line(&self, line: impl Into<String>) {
        self.state.lines.lock().push_back(line.into());
    }

    /// Queue `lines` in order.
    pub fn push_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lines
            .lock()
            .extend(lines.into_iter().map(Into::into));
    }

    /// Lines still waiting to be read.
    pub fn pending_lines(&self) -> usize {
        self.state.lines.lock().len()
    }

    /// After the script drains, reads fail with [`DaqError::TransportClosed`].
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// Trigger a failure on the next read
    pub fn trigger_failure(&self) {
        self.state.should_fail_next.store(true, Ordering::SeqCst);
    }

    /// Get a copy of the call log for verification
    pub fn get_call_log(&self) -> Vec<String> {
        self.state.call_log.lock().clone()
    }

    /// Clear the call log
    pub fn clear_call_log(&self) {
        self.state.call_log.lock().clear();
    }

    fn log_call(&self, method: &str) {
        self.state.call_log.lock().push(method.to_string());
    }
}

impl LineTransport for MockLineAdapter {
    fn read_reply(&mut self) -> AppResult<String> {
        self.log_call("read_reply");

        if self.state.should_fail_next.swap(false, Ordering::SeqCst) {
            return Err(DaqError::Transport("Mock read failure".into()));
        }

        if let Some(line) = self.state.lines.lock().pop_front() {
            return Ok(line);
        }

        if self.state.closed.load(Ordering::SeqCst) {
            Err(DaqError::TransportClosed)
        } else {
            Ok(String::new())
        }
    }

    fn info(&self) -> String {
        format!("MockLineAdapter ({} lines queued)", self.pending_lines())
    }
}
