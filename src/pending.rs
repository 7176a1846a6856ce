//! Pending-waveform queue.
//!
//! The acquisition side pushes one [`SampleSet`] per data row; the delivery side pops at most
//! one per call. A single mutex covers both operations and is held only for the push or pop
//! itself, so neither side ever blocks on the other's processing.
//!
//! The queue is unbounded. For the low-rate telemetry this driver targets the consumer keeps
//! up easily; if it does not, memory grows rather than samples being dropped.

use crate::channel::StreamDescriptor;
use crate::waveform::Waveform;
use parking_lot::Mutex;
use std::collections::{btree_map, BTreeMap, VecDeque};

/// Waveforms produced from one data row, keyed by channel stream.
///
/// Owns its waveforms until delivery hands each one to its channel.
#[derive(Debug, Default)]
pub struct SampleSet {
    entries: BTreeMap<StreamDescriptor, Waveform>,
}

impl SampleSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the waveform for `key`, returning any waveform it displaced.
    pub fn insert(&mut self, key: StreamDescriptor, waveform: Waveform) -> Option<Waveform> {
        self.entries.insert(key, waveform)
    }

    /// Waveform queued for `key`, if the row had a value for that channel.
    pub fn get(&self, key: &StreamDescriptor) -> Option<&Waveform> {
        self.entries.get(key)
    }

    /// Number of channel streams carrying a sample.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no channel value parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in channel order.
    pub fn iter(&self) -> btree_map::Iter<'_, StreamDescriptor, Waveform> {
        self.entries.iter()
    }
}

impl IntoIterator for SampleSet {
    type Item = (StreamDescriptor, Waveform);
    type IntoIter = btree_map::IntoIter<StreamDescriptor, Waveform>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// FIFO of sample sets awaiting delivery, oldest first.
#[derive(Debug, Default)]
pub struct PendingWaveforms {
    queue: Mutex<VecDeque<SampleSet>>,
}

impl PendingWaveforms {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `set` to the back of the queue.
    pub fn enqueue(&self, set: SampleSet) {
        self.queue.lock().push_back(set);
    }

    /// Remove and return the oldest set, or `None` when nothing is pending.
    pub fn try_dequeue(&self) -> Option<SampleSet> {
        self.queue.lock().pop_front()
    }

    /// Number of sets waiting.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
