//! Serial line transport for RS-232 / USB-serial data sources.
//!
//! Typical source: a microcontroller printing `CSV-*` records over a UART. The port is opened
//! with a short read timeout so the acquisition step stays bounded: a timeout with no complete
//! line yields an empty reply, and the bytes received so far wait for the next call.

use crate::adapters::{take_line, LineTransport};
use crate::error::{AppResult, DaqError};
use std::time::Duration;
use tracing::debug;

#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;

/// Default per-read timeout; keeps one acquisition step short.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest unterminated line kept before the buffer is discarded.
pub const MAX_PARTIAL_LINE: usize = 4096;

/// Serial adapter yielding one line per [`LineTransport::read_reply`] call.
pub struct SerialAdapter {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// Baud rate (e.g., 115200)
    baud_rate: u32,

    /// Read timeout for a single poll
    timeout: Duration,

    /// Line ending byte
    line_delimiter: u8,

    /// Bytes received after the last complete line
    partial: Vec<u8>,

    #[cfg(feature = "instrument_serial")]
    port: Option<Box<dyn SerialPort>>,
}

impl SerialAdapter {
    /// Create an unconnected adapter.
    ///
    /// # Arguments
    /// * `port_name` - Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    /// * `baud_rate` - Communication speed (e.g., 9600, 115200)
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            timeout: DEFAULT_READ_TIMEOUT,
            line_delimiter: b'\n',
            partial: Vec::new(),
            #[cfg(feature = "instrument_serial")]
            port: None,
        }
    }

    /// Set read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set line delimiter byte
    pub fn with_line_delimiter(mut self, delimiter: u8) -> Self {
        self.line_delimiter = delimiter;
        self
    }

    /// Open the serial port.
    #[cfg(feature = "instrument_serial")]
    pub fn connect(&mut self) -> AppResult<()> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|e| {
                DaqError::Transport(format!(
                    "Failed to open serial port '{}' at {} baud: {}",
                    self.port_name, self.baud_rate, e
                ))
            })?;

        self.port = Some(port);
        self.partial.clear();
        debug!(
            "Serial port '{}' opened at {} baud",
            self.port_name, self.baud_rate
        );
        Ok(())
    }

    /// Always fails: serial support was not compiled in.
    #[cfg(not(feature = "instrument_serial"))]
    pub fn connect(&mut self) -> AppResult<()> {
        Err(DaqError::SerialFeatureDisabled)
    }

    /// Close the port, discarding any partial line.
    pub fn disconnect(&mut self) {
        #[cfg(feature = "instrument_serial")]
        {
            if self.port.take().is_some() {
                debug!("Serial port '{}' closed", self.port_name);
            }
        }
        self.partial.clear();
    }

    /// Whether the port is open.
    pub fn is_connected(&self) -> bool {
        #[cfg(feature = "instrument_serial")]
        {
            self.port.is_some()
        }

        #[cfg(not(feature = "instrument_serial"))]
        {
            false
        }
    }

    /// Buffer received bytes, dropping an unterminated line that outgrew [`MAX_PARTIAL_LINE`].
    #[cfg_attr(not(feature = "instrument_serial"), allow(dead_code))]
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.partial.extend_from_slice(bytes);
        if self.partial.len() > MAX_PARTIAL_LINE && !self.partial.contains(&self.line_delimiter) {
            debug!(
                port = self.port_name.as_str(),
                bytes = self.partial.len(),
                "discarding unterminated input"
            );
            self.partial.clear();
        }
    }

    #[cfg(feature = "instrument_serial")]
    fn fill(&mut self) -> AppResult<()> {
        use std::io::Read;

        let port = self.port.as_mut().ok_or(DaqError::SerialPortNotConnected)?;
        let mut buffer = [0u8; 256];

        match port.read(&mut buffer) {
            Ok(0) => Err(DaqError::Transport(format!(
                "Unexpected EOF from serial port '{}'",
                self.port_name
            ))),
            Ok(n) => {
                self.push_bytes(&buffer[..n]);
                Ok(())
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                Ok(())
            }
            Err(e) => Err(DaqError::Transport(format!(
                "Serial read error on '{}': {}",
                self.port_name, e
            ))),
        }
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn fill(&mut self) -> AppResult<()> {
        Err(DaqError::SerialFeatureDisabled)
    }
}

impl LineTransport for SerialAdapter {
    fn read_reply(&mut self) -> AppResult<String> {
        if let Some(line) = take_line(&mut self.partial, self.line_delimiter) {
            return Ok(line);
        }
        self.fill()?;
        Ok(take_line(&mut self.partial, self.line_delimiter).unwrap_or_default())
    }

    fn info(&self) -> String {
        format!(
            "SerialAdapter({} @ {} baud)",
            self.port_name, self.baud_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_adapter_creation() {
        let adapter = SerialAdapter::new("/dev/ttyUSB0".to_string(), 115200);
        assert!(!adapter.is_connected());
        assert_eq!(adapter.port_name, "/dev/ttyUSB0");
        assert_eq!(adapter.baud_rate, 115200);
        assert_eq!(adapter.timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_serial_adapter_builder() {
        let adapter = SerialAdapter::new("/dev/ttyUSB0".to_string(), 9600)
            .with_timeout(Duration::from_millis(500))
            .with_line_delimiter(b'\r');

        assert_eq!(adapter.timeout, Duration::from_millis(500));
        assert_eq!(adapter.line_delimiter, b'\r');
    }

    #[test]
    fn test_info_string() {
        let adapter = SerialAdapter::new("COM3".to_string(), 115200);
        let info = adapter.info();
        assert!(info.contains("COM3"));
        assert!(info.contains("115200"));
    }

    #[test]
    fn test_buffered_lines_served_before_reading() {
        // Lines already buffered are returned without touching the (absent) port
        let mut adapter = SerialAdapter::new("/dev/null".to_string(), 9600);
        adapter.partial.extend_from_slice(b"CSV-NAME,A\nCSV-UNIT,V\n");
        assert_eq!(adapter.read_reply().unwrap(), "CSV-NAME,A");
        assert_eq!(adapter.read_reply().unwrap(), "CSV-UNIT,V");
    }

    #[test]
    fn test_unterminated_input_is_discarded() {
        let mut adapter = SerialAdapter::new("/dev/null".to_string(), 9600);
        adapter.push_bytes(&[b'x'; MAX_PARTIAL_LINE]);
        assert_eq!(adapter.partial.len(), MAX_PARTIAL_LINE);

        adapter.push_bytes(b"x");
        assert!(adapter.partial.is_empty());

        // Stream resynchronises on the next complete line
        adapter.push_bytes(b"CSV-DATA,1,2\n");
        assert_eq!(adapter.read_reply().unwrap(), "CSV-DATA,1,2");
    }

    #[test]
    fn test_long_buffer_with_complete_lines_is_kept() {
        let mut adapter = SerialAdapter::new("/dev/null".to_string(), 9600);
        let mut bytes = b"CSV-NAME,A\n".to_vec();
        bytes.extend_from_slice(&[b'y'; MAX_PARTIAL_LINE]);
        adapter.push_bytes(&bytes);
        assert_eq!(adapter.read_reply().unwrap(), "CSV-NAME,A");
    }

    #[test]
    fn test_read_without_connection_fails() {
        let mut adapter = SerialAdapter::new("/dev/null".to_string(), 9600);
        assert!(adapter.read_reply().is_err());
    }
}
