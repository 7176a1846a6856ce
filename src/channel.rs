//! Instrument channels.
//!
//! A channel lives for the whole lifetime of its instrument. Two different roles touch it:
//! the record interpreter (producer side) rewrites the display name and Y-axis unit, and the
//! delivery engine (consumer side) replaces or grows the current waveform. Those two pieces of
//! state sit behind separate locks so neither role ever waits on the other's work.

use crate::units::Unit;
use crate::waveform::Waveform;
use parking_lot::{Mutex, MutexGuard, RwLock};

/// Kind of data a channel stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// Floating-point samples
    Analog,
    /// Logic levels
    Digital,
}

/// Input coupling reported by the channel capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouplingType {
    /// DC, 1 MOhm
    Dc1M,
    /// AC, 1 MOhm
    Ac1M,
    /// DC, 50 Ohm
    Dc50,
    /// AC, 50 Ohm
    Ac50,
    /// Input grounded
    Gnd,
}

/// Key of one stream of one channel inside a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamDescriptor {
    /// Channel index in the instrument's channel list
    pub channel: usize,
    /// Sub-stream of the channel (always 0 for this driver)
    pub stream: usize,
}

impl StreamDescriptor {
    /// Stream `stream` of channel `channel`.
    pub fn new(channel: usize, stream: usize) -> Self {
        Self { channel, stream }
    }

    /// Primary stream of `channel`.
    pub fn primary(channel: usize) -> Self {
        Self::new(channel, 0)
    }
}

#[derive(Debug)]
struct ChannelMeta {
    display_name: String,
    y_units: Vec<Unit>,
}

/// One acquisition channel.
#[derive(Debug)]
pub struct Channel {
    index: usize,
    hwname: String,
    color: String,
    x_unit: Unit,
    stream_type: StreamType,
    meta: RwLock<ChannelMeta>,
    data: Mutex<Vec<Option<Waveform>>>,
}

impl Channel {
    /// Create a single-stream analog channel with time on X and `y_unit` on Y.
    pub fn new(
        index: usize,
        hwname: impl Into<String>,
        color: impl Into<String>,
        y_unit: Unit,
    ) -> Self {
        let hwname = hwname.into();
        Self {
            index,
            color: color.into(),
            x_unit: Unit::Femtoseconds,
            stream_type: StreamType::Analog,
            meta: RwLock::new(ChannelMeta {
                display_name: hwname.clone(),
                y_units: vec![y_unit],
            }),
            data: Mutex::new(vec![None]),
            hwname,
        }
    }

    /// Position in the instrument's channel list, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Hardware name, fixed at construction (`CH1`, `CH2`, ...).
    pub fn hwname(&self) -> &str {
        &self.hwname
    }

    /// Display colour as `#rrggbb`.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// X-axis unit. Always femtoseconds, the unit of `CSV-DATA` timestamps.
    pub fn x_unit(&self) -> Unit {
        self.x_unit
    }

    /// Kind of data on the channel's streams.
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Number of waveform slots.
    pub fn stream_count(&self) -> usize {
        self.data.lock().len()
    }

    /// User-visible name, initially the hardware name.
    pub fn display_name(&self) -> String {
        self.meta.read().display_name.clone()
    }

    /// Rename the channel. The hardware name is unaffected.
    pub fn set_display_name(&self, name: impl Into<String>) {
        self.meta.write().display_name = name.into();
    }

    /// Y-axis unit of `stream`, or the channel default if the stream does not exist.
    pub fn y_unit(&self, stream: usize) -> Unit {
        self.meta
            .read()
            .y_units
            .get(stream)
            .copied()
            .unwrap_or_default()
    }

    /// Set the Y-axis unit of `stream`; ignored if the stream does not exist.
    pub fn set_y_unit(&self, unit: Unit, stream: usize) {
        let mut meta = self.meta.write();
        if let Some(slot) = meta.y_units.get_mut(stream) {
            *slot = unit;
        }
    }

    /// Snapshot of the current waveform on `stream`.
    pub fn waveform(&self, stream: usize) -> Option<Waveform> {
        self.data.lock().get(stream).cloned().flatten()
    }

    /// Number of samples currently held on `stream` (0 when there is no waveform).
    pub fn sample_count(&self, stream: usize) -> usize {
        self.data
            .lock()
            .get(stream)
            .and_then(|slot| slot.as_ref().map(Waveform::len))
            .unwrap_or(0)
    }

    /// Install `waveform` as the current data of `stream`, dropping the previous one.
    pub fn set_data(&self, waveform: Waveform, stream: usize) {
        if let Some(slot) = self.data.lock().get_mut(stream) {
            *slot = Some(waveform);
        }
    }

    /// Exclusive access to the per-stream waveform slots.
    pub(crate) fn data_slots(&self) -> MutexGuard<'_, Vec<Option<Waveform>>> {
        self.data.lock()
    }
}
