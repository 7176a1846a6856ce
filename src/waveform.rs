//! Waveform storage.
//!
//! A waveform is a sequence of `(offset, duration, value)` samples sharing a timescale and a
//! trigger phase. The [`WaveformKind`] tag decides whether a waveform can absorb more samples:
//! only sparse analog waveforms (explicit per-sample offsets) are append-compatible, because a
//! uniform waveform's offsets are implied by its sample index.

use chrono::{DateTime, Utc};

/// Storage layout of a waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformKind {
    /// Explicit offset and duration per sample. Grows in place when streaming.
    SparseAnalog,
    /// Fixed sample interval; offsets are `index`, durations are 1.
    UniformAnalog,
}

/// Analog waveform owned by a channel stream.
#[derive(Debug, Clone)]
pub struct Waveform {
    kind: WaveformKind,
    /// Femtoseconds per offset unit
    pub timescale: i64,
    /// Sub-sample trigger phase in femtoseconds
    pub trigger_phase: i64,
    /// Wall-clock time the capture was stamped
    pub start_timestamp: DateTime<Utc>,
    /// Femtosecond part of the capture stamp
    pub start_femtoseconds: i64,
    offsets: Vec<i64>,
    durations: Vec<i64>,
    samples: Vec<f32>,
    revision: u64,
    modified: bool,
}

impl Waveform {
    /// Single-sample sparse waveform as produced by one `CSV-DATA` field.
    ///
    /// Carries exactly one sample at `timestamp_fs` with duration 1, timescale 1 and zero
    /// trigger phase, stamped with the current wall-clock second.
    pub fn single_sample(timestamp_fs: i64, value: f32) -> Self {
        Self {
            kind: WaveformKind::SparseAnalog,
            timescale: 1,
            trigger_phase: 0,
            start_timestamp: capture_stamp(),
            start_femtoseconds: 0,
            offsets: vec![timestamp_fs],
            durations: vec![1],
            samples: vec![value],
            revision: 0,
            modified: true,
        }
    }

    /// Uniformly sampled waveform with `timescale` femtoseconds between samples.
    pub fn uniform(timescale: i64, samples: Vec<f32>) -> Self {
        let len = samples.len() as i64;
        Self {
            kind: WaveformKind::UniformAnalog,
            timescale,
            trigger_phase: 0,
            start_timestamp: capture_stamp(),
            start_femtoseconds: 0,
            offsets: (0..len).collect(),
            durations: vec![1; samples.len()],
            samples,
            revision: 0,
            modified: true,
        }
    }

    /// Storage layout tag.
    pub fn kind(&self) -> WaveformKind {
        self.kind
    }

    /// Whether samples from another sparse waveform may be appended to this one.
    pub fn is_append_compatible(&self) -> bool {
        self.kind == WaveformKind::SparseAnalog
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Start of each sample, in timescale units.
    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    /// Length of each sample, in timescale units.
    pub fn durations(&self) -> &[i64] {
        &self.durations
    }

    /// Sample values.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Last sample as `(offset, duration, value)`.
    pub fn last(&self) -> Option<(i64, i64, f32)> {
        let i = self.len().checked_sub(1)?;
        Some((self.offsets[i], self.durations[i], self.samples[i]))
    }

    /// Bumped every time samples are appended.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Set when samples changed since the last clear.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Record that the sample arrays changed since the consumer last looked.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Clear the modified flag once the consumer has picked up the current contents.
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Absorb every sample of `other` onto the end of this waveform.
    ///
    /// Both waveforms must be append-compatible; returns `Err(other)` untouched otherwise so
    /// the caller can install it instead. On success the revision is incremented and the
    /// waveform is marked modified.
    pub fn append(&mut self, other: Waveform) -> Result<(), Waveform> {
        if !self.is_append_compatible() || !other.is_append_compatible() {
            return Err(other);
        }

        if let (Some((last, _, _)), Some(&first)) = (self.last(), other.offsets.first()) {
            if first < last {
                tracing::debug!(
                    last_offset = last,
                    new_offset = first,
                    "appending sample with an earlier timestamp"
                );
            }
        }

        self.offsets.extend_from_slice(&other.offsets);
        self.durations.extend_from_slice(&other.durations);
        self.samples.extend_from_slice(&other.samples);
        self.revision += 1;
        self.mark_modified();
        Ok(())
    }
}

fn capture_stamp() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
