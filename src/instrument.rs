//! CSV stream instrument.
//!
//! An oscilloscope-like driver fed by a unidirectional stream of `CSV-*` records, typically
//! real-time state (voltages, temperatures, ADC codes) printed by a microcontroller over a
//! UART or SWO trace port. See [`crate::protocol`] for the wire format.
//!
//! # Data flow
//!
//! ```text
//! transport --line--> acquire_data --SampleSet--> PendingWaveforms
//!                     (producer thread)                  |
//!                                                        v
//!                     channels <-------------- pop_pending_waveform
//!                                                (consumer thread)
//! ```
//!
//! The first delivered set replaces each touched channel's waveform; from then on the driver
//! is in streaming mode and every delivered sample is appended to the existing waveform, so a
//! channel accumulates one long trace instead of churning through single-sample captures.
//!
//! # Example
//!
//! ```
//! use csv_stream_daq::adapters::MockLineAdapter;
//! use csv_stream_daq::capabilities::WaveformSource;
//! use csv_stream_daq::instrument::CsvStreamInstrument;
//!
//! let transport = MockLineAdapter::with_lines(["CSV-NAME,Vbat", "CSV-DATA,1000,3.7"]);
//! let scope = CsvStreamInstrument::new(Box::new(transport));
//!
//! scope.acquire_data()?;
//! scope.acquire_data()?;
//! assert!(scope.pop_pending_waveform());
//! assert_eq!(scope.channel(0).map(|c| c.sample_count(0)), Some(1));
//! # Ok::<(), csv_stream_daq::error::DaqError>(())
//! ```

use crate::adapters::LineTransport;
use crate::capabilities::{
    ChannelControl, Instrument, InstrumentInfo, InstrumentTypes, InterleaveConflict,
    TimebaseControl, TriggerControl, TriggerMode, WaveformSource,
};
use crate::channel::{Channel, CouplingType, StreamDescriptor};
use crate::error::AppResult;
use crate::pending::{PendingWaveforms, SampleSet};
use crate::protocol::{decode_line, Record, RecordType, MIN_DATA_FIELDS};
use crate::units::Unit;
use crate::waveform::Waveform;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "csvstream";

/// Number of channels before any session is loaded.
pub const DEFAULT_CHANNEL_COUNT: usize = 4;

/// Colours of the default channels.
const DEFAULT_COLORS: [&str; DEFAULT_CHANNEL_COUNT] =
    ["#ffff00", "#ff6abc", "#00ffff", "#00c100"];

/// Colour of channels created to fill gaps when a session references a higher index.
pub(crate) const PLACEHOLDER_COLOR: &str = "#808080";

/// Driver for line-oriented CSV telemetry streams.
pub struct CsvStreamInstrument {
    info: InstrumentInfo,
    channels: Vec<Arc<Channel>>,
    transport: Mutex<Box<dyn LineTransport>>,
    pending: PendingWaveforms,
    trigger_armed: AtomicBool,
    trigger_one_shot: AtomicBool,
    appending_next: AtomicBool,
}

impl CsvStreamInstrument {
    /// Create the driver with the four default channels `CH1`..`CH4` (volts on Y).
    pub fn new(transport: Box<dyn LineTransport>) -> Self {
        info!(transport = %transport.info(), "CSV stream instrument created");

        let channels = DEFAULT_COLORS
            .iter()
            .enumerate()
            .map(|(i, color)| {
                Arc::new(Channel::new(i, format!("CH{}", i + 1), *color, Unit::Volts))
            })
            .collect();

        Self {
            info: InstrumentInfo {
                vendor: "Generic".to_string(),
                model: "CSV Stream".to_string(),
                serial: "N/A".to_string(),
                firmware_version: "1.0".to_string(),
            },
            channels,
            transport: Mutex::new(transport),
            pending: PendingWaveforms::new(),
            trigger_armed: AtomicBool::new(false),
            trigger_one_shot: AtomicBool::new(false),
            appending_next: AtomicBool::new(false),
        }
    }

    /// Current number of channels. Starts at four and only grows.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channel at `index`, or `None` past the end of the list.
    pub fn channel(&self, index: usize) -> Option<&Arc<Channel>> {
        self.channels.get(index)
    }

    /// All channels in index order.
    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    /// Number of sample sets waiting for delivery.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether the current arming is for a single acquisition.
    pub fn is_one_shot(&self) -> bool {
        self.trigger_one_shot.load(Ordering::SeqCst)
    }

    /// Grow the channel list to `count` channels. Never shrinks.
    pub(crate) fn ensure_channel_count(&mut self, count: usize) {
        while self.channels.len() < count {
            let index = self.channels.len();
            debug!(channel = index, "creating placeholder channel");
            self.channels.push(Arc::new(Channel::new(
                index,
                format!("CH{}", index + 1),
                PLACEHOLDER_COLOR,
                Unit::Volts,
            )));
        }
    }

    /// Decode and apply one line of input.
    ///
    /// Lines without a record, unknown records and malformed rows are dropped here; nothing
    /// about a bad line is reported to the caller.
    pub fn process_line(&self, line: &str) {
        let Some(record) = decode_line(line) else {
            trace!(line = line.trim(), "ignoring non-record line");
            return;
        };

        match record.kind {
            RecordType::Name => self.apply_names(&record),
            RecordType::Unit => self.apply_units(&record),
            RecordType::Data => {
                if let Some(set) = self.build_sample_set(&record) {
                    self.pending.enqueue(set);
                }
            }
            RecordType::Unknown => {
                trace!(tag = record.tag(), "ignoring unknown record type");
            }
        }
    }

    /// `CSV-NAME`: field N names channel N-1. Extra fields are ignored.
    fn apply_names(&self, record: &Record<'_>) {
        for (channel, name) in self.channels.iter().zip(record.payload()) {
            channel.set_display_name(*name);
        }
        debug!(count = record.payload().len().min(self.channels.len()), "channel names updated");
    }

    /// `CSV-UNIT`: field N sets the Y-axis unit of channel N-1. Extra fields are ignored.
    fn apply_units(&self, record: &Record<'_>) {
        for (channel, tag) in self.channels.iter().zip(record.payload()) {
            channel.set_y_unit(Unit::from_tag(tag), 0);
        }
        debug!(count = record.payload().len().min(self.channels.len()), "channel units updated");
    }

    /// `CSV-DATA`: build one sample set from the row, or `None` if nothing usable was in it.
    fn build_sample_set(&self, record: &Record<'_>) -> Option<SampleSet> {
        if record.fields.len() < MIN_DATA_FIELDS {
            trace!(fields = record.fields.len(), "data row too short");
            return None;
        }

        let timestamp_field = record.fields[1];
        let timestamp = match timestamp_field.trim().parse::<i64>() {
            Ok(ts) => ts,
            Err(e) => {
                debug!(field = timestamp_field, error = %e, "dropping data row with bad timestamp");
                return None;
            }
        };

        let mut set = SampleSet::new();
        for (channel, field) in self.channels.iter().zip(&record.fields[2..]) {
            let unit = channel.y_unit(0);
            match unit.parse_value(field) {
                Some(value) => {
                    set.insert(
                        StreamDescriptor::primary(channel.index()),
                        Waveform::single_sample(timestamp, value as f32),
                    );
                }
                None => {
                    debug!(
                        channel = channel.index(),
                        field = *field,
                        unit = %unit,
                        "dropping unparseable value"
                    );
                }
            }
        }

        if set.is_empty() {
            debug!(timestamp_fs = timestamp, "data row produced no samples");
            None
        } else {
            Some(set)
        }
    }

    /// Commit one waveform to its channel stream, replacing or appending.
    fn deliver(&self, key: StreamDescriptor, waveform: Waveform, appending: bool) {
        let Some(channel) = self.channels.get(key.channel) else {
            warn!(channel = key.channel, "sample set references unknown channel");
            return;
        };

        let mut slots = channel.data_slots();
        let Some(slot) = slots.get_mut(key.stream) else {
            warn!(
                channel = key.channel,
                stream = key.stream,
                "sample set references unknown stream"
            );
            return;
        };

        let leftover = match slot.as_mut() {
            Some(existing) if appending => existing.append(waveform).err(),
            _ => Some(waveform),
        };

        if let Some(waveform) = leftover {
            *slot = Some(waveform);
        }
    }
}

impl Instrument for CsvStreamInstrument {
    fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn instrument_types(&self) -> InstrumentTypes {
        InstrumentTypes::OSCILLOSCOPE
    }

    fn instrument_types_for_channel(&self, _channel: usize) -> InstrumentTypes {
        InstrumentTypes::OSCILLOSCOPE
    }

    fn flush_config_cache(&self) {}
}

impl ChannelControl for CsvStreamInstrument {
    fn is_channel_enabled(&self, _channel: usize) -> bool {
        true
    }

    fn enable_channel(&self, _channel: usize) {}

    fn disable_channel(&self, _channel: usize) {}

    fn channel_coupling(&self, _channel: usize) -> CouplingType {
        CouplingType::Dc50
    }

    fn set_channel_coupling(&self, _channel: usize, _coupling: CouplingType) {}

    fn available_couplings(&self, _channel: usize) -> Vec<CouplingType> {
        Vec::new()
    }

    fn channel_attenuation(&self, _channel: usize) -> f64 {
        1.0
    }

    fn set_channel_attenuation(&self, _channel: usize, _attenuation: f64) {}

    fn channel_bandwidth_limit(&self, _channel: usize) -> u32 {
        0
    }

    fn set_channel_bandwidth_limit(&self, _channel: usize, _limit_mhz: u32) {}

    fn channel_bandwidth_limiters(&self, _channel: usize) -> Vec<u32> {
        Vec::new()
    }

    fn channel_voltage_range(&self, _channel: usize, _stream: usize) -> f32 {
        5.0
    }

    fn set_channel_voltage_range(&self, _channel: usize, _stream: usize, _range: f32) {}

    fn channel_offset(&self, _channel: usize, _stream: usize) -> f32 {
        0.0
    }

    fn set_channel_offset(&self, _channel: usize, _stream: usize, _offset: f32) {}

    fn probe_name(&self, _channel: usize) -> String {
        String::new()
    }

    fn external_trigger(&self) -> Option<usize> {
        None
    }
}

impl TriggerControl for CsvStreamInstrument {
    fn poll_trigger(&self) -> TriggerMode {
        if self.trigger_armed.load(Ordering::SeqCst) {
            TriggerMode::Triggered
        } else {
            TriggerMode::Stop
        }
    }

    fn start(&self) {
        self.trigger_armed.store(true, Ordering::SeqCst);
        self.trigger_one_shot.store(false, Ordering::SeqCst);
    }

    fn start_single_trigger(&self) {
        self.trigger_armed.store(true, Ordering::SeqCst);
        self.trigger_one_shot.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.trigger_armed.store(false, Ordering::SeqCst);
    }

    fn force_trigger(&self) {
        self.trigger_armed.store(true, Ordering::SeqCst);
    }

    fn is_trigger_armed(&self) -> bool {
        self.trigger_armed.load(Ordering::SeqCst)
    }

    fn push_trigger(&self) {}

    fn pull_trigger(&self) {}
}

impl TimebaseControl for CsvStreamInstrument {
    fn sample_rates_non_interleaved(&self) -> Vec<u64> {
        vec![1]
    }

    fn sample_rates_interleaved(&self) -> Vec<u64> {
        Vec::new()
    }

    fn interleave_conflicts(&self) -> BTreeSet<InterleaveConflict> {
        BTreeSet::new()
    }

    fn sample_depths_non_interleaved(&self) -> Vec<u64> {
        vec![1]
    }

    fn sample_depths_interleaved(&self) -> Vec<u64> {
        Vec::new()
    }

    fn sample_rate(&self) -> u64 {
        1
    }

    fn sample_depth(&self) -> u64 {
        1
    }

    fn set_sample_depth(&self, _depth: u64) {}

    fn set_sample_rate(&self, _rate: u64) {}

    fn trigger_offset(&self) -> i64 {
        0
    }

    fn set_trigger_offset(&self, _offset: i64) {}

    fn is_interleaving(&self) -> bool {
        false
    }

    fn set_interleaving(&self, _combine: bool) -> bool {
        false
    }
}

impl WaveformSource for CsvStreamInstrument {
    /// Read one line from the transport and apply it.
    ///
    /// Fails only when the transport does; malformed input is not an error.
    #[instrument(skip(self), level = "trace")]
    fn acquire_data(&self) -> AppResult<()> {
        let line = self.transport.lock().read_reply().map_err(|e| {
            warn!(error = %e, "transport read failed");
            e
        })?;
        self.process_line(&line);
        Ok(())
    }

    /// Deliver the oldest pending sample set, if any.
    ///
    /// Returns `false` without side effects when nothing is pending. After a set is delivered
    /// the driver is in streaming mode for good.
    fn pop_pending_waveform(&self) -> bool {
        let Some(set) = self.pending.try_dequeue() else {
            return false;
        };

        let appending = self.appending_next.load(Ordering::SeqCst);
        trace!(entries = set.len(), appending, "delivering sample set");
        for (key, waveform) in set {
            self.deliver(key, waveform, appending);
        }

        if !self.appending_next.swap(true, Ordering::SeqCst) {
            info!("first waveform delivered, streaming mode enabled");
        }
        true
    }

    fn is_appending_to_waveform(&self) -> bool {
        self.appending_next.load(Ordering::SeqCst)
    }
}
