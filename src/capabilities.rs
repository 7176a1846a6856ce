//! Instrument Capabilities
//!
//! The host framework drives every oscilloscope-like instrument through the same set of
//! capability traits. A streaming source such as the CSV stream driver only has real
//! behaviour behind a few of them (acquisition, delivery, the armed flag); the rest are
//! answered with fixed values. Implementations spell every method out rather than relying
//! on default bodies, so the full contract stays visible in each driver.
//!
//! - [`Instrument`]: identity and instrument type
//! - [`ChannelControl`]: per-channel front-end settings
//! - [`TriggerControl`]: arm / disarm / poll
//! - [`TimebaseControl`]: sample rate, depth, interleaving
//! - [`WaveformSource`]: acquisition step and waveform hand-off
//!
//! # Thread Safety
//! - All methods take `&self`; drivers use interior mutability for state
//! - Traits require `Send + Sync` so one driver can be shared between the host's
//!   acquisition thread and its render thread
//!
//! # Example
//!
//! ```rust,ignore
//! fn poll_once<S>(scope: &S) -> AppResult<bool>
//! where
//!     S: TriggerControl + WaveformSource,
//! {
//!     if scope.poll_trigger() == TriggerMode::Triggered {
//!         scope.acquire_data()?;
//!     }
//!     Ok(scope.pop_pending_waveform())
//! }
//! ```

use crate::channel::CouplingType;
use crate::error::AppResult;
use std::collections::BTreeSet;

/// Bit set of instrument kinds a driver (or one of its channels) exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrumentTypes(u32);

impl InstrumentTypes {
    /// Captures waveforms
    pub const OSCILLOSCOPE: Self = Self(0x01);
    /// Reads single values
    pub const MULTIMETER: Self = Self(0x02);
    /// Sources voltage or current
    pub const POWER_SUPPLY: Self = Self(0x04);
    /// Generates signals
    pub const FUNCTION_GENERATOR: Self = Self(0x08);

    /// Raw bit mask.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if every kind in `other` is also in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Result of polling the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Armed and waiting to trigger
    Run,
    /// Disarmed
    Stop,
    /// Data is (or may be) ready to acquire
    Triggered,
    /// Waiting for a trigger event
    Wait,
    /// Free-running
    Auto,
}

/// A pair of channels that cannot both be used while interleaving.
pub type InterleaveConflict = (usize, usize);

/// Static identity of an instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    /// Manufacturer
    pub vendor: String,
    /// Model name
    pub model: String,
    /// Serial number, empty when unknown
    pub serial: String,
    /// Firmware revision, empty when unknown
    pub firmware_version: String,
}

/// Capability: Instrument Identity
pub trait Instrument: Send + Sync {
    /// Vendor, model, serial and firmware strings
    fn info(&self) -> &InstrumentInfo;

    /// Name the driver is registered under
    fn driver_name(&self) -> &'static str;

    fn instrument_types(&self) -> InstrumentTypes;

    fn instrument_types_for_channel(&self, channel: usize) -> InstrumentTypes;

    /// Drop any cached hardware settings so the next getter re-reads them
    fn flush_config_cache(&self);
}

/// Capability: Channel Front-End Configuration
///
/// Voltage range and offset are per stream; everything else is per channel.
pub trait ChannelControl: Send + Sync {
    fn is_channel_enabled(&self, channel: usize) -> bool;
    fn enable_channel(&self, channel: usize);
    fn disable_channel(&self, channel: usize);

    fn channel_coupling(&self, channel: usize) -> CouplingType;
    fn set_channel_coupling(&self, channel: usize, coupling: CouplingType);
    fn available_couplings(&self, channel: usize) -> Vec<CouplingType>;

    fn channel_attenuation(&self, channel: usize) -> f64;
    fn set_channel_attenuation(&self, channel: usize, attenuation: f64);

    /// Bandwidth limit in MHz, 0 meaning no limit
    fn channel_bandwidth_limit(&self, channel: usize) -> u32;
    fn set_channel_bandwidth_limit(&self, channel: usize, limit_mhz: u32);
    fn channel_bandwidth_limiters(&self, channel: usize) -> Vec<u32>;

    fn channel_voltage_range(&self, channel: usize, stream: usize) -> f32;
    fn set_channel_voltage_range(&self, channel: usize, stream: usize, range: f32);

    fn channel_offset(&self, channel: usize, stream: usize) -> f32;
    fn set_channel_offset(&self, channel: usize, stream: usize, offset: f32);

    fn probe_name(&self, channel: usize) -> String;

    /// Index of a dedicated external trigger input, if the instrument has one
    fn external_trigger(&self) -> Option<usize>;
}

/// Capability: Triggering
///
/// # Contract
/// - `start` arms continuously, `start_single_trigger` arms for one acquisition
/// - `stop` disarms
/// - `poll_trigger` reports whether the host should run the acquisition step
pub trait TriggerControl: Send + Sync {
    fn poll_trigger(&self) -> TriggerMode;
    fn start(&self);
    fn start_single_trigger(&self);
    fn stop(&self);
    fn force_trigger(&self);
    fn is_trigger_armed(&self) -> bool;

    /// Write the host-side trigger configuration to the instrument
    fn push_trigger(&self);

    /// Read the instrument's trigger configuration back into the host
    fn pull_trigger(&self);
}

/// Capability: Timebase
///
/// Rates are in samples per second, depths in samples.
pub trait TimebaseControl: Send + Sync {
    fn sample_rates_non_interleaved(&self) -> Vec<u64>;
    fn sample_rates_interleaved(&self) -> Vec<u64>;
    fn interleave_conflicts(&self) -> BTreeSet<InterleaveConflict>;
    fn sample_depths_non_interleaved(&self) -> Vec<u64>;
    fn sample_depths_interleaved(&self) -> Vec<u64>;

    fn sample_rate(&self) -> u64;
    fn sample_depth(&self) -> u64;
    fn set_sample_depth(&self, depth: u64);
    fn set_sample_rate(&self, rate: u64);

    /// Trigger position in femtoseconds from the start of the capture
    fn trigger_offset(&self) -> i64;
    fn set_trigger_offset(&self, offset: i64);

    fn is_interleaving(&self) -> bool;

    /// Request interleaving; returns the resulting state
    fn set_interleaving(&self, combine: bool) -> bool;
}

/// Capability: Waveform Acquisition and Hand-off
///
/// # Contract
/// - `acquire_data` runs on the host's acquisition thread and performs one bounded unit of
///   work; it fails only if the underlying transport is gone
/// - `pop_pending_waveform` runs on the host's render thread, commits at most one queued
///   waveform set to the channels and reports whether it did
pub trait WaveformSource: Send + Sync {
    fn acquire_data(&self) -> AppResult<()>;
    fn pop_pending_waveform(&self) -> bool;

    /// Whether the next delivered set will be appended to existing waveforms
    fn is_appending_to_waveform(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_type_bits() {
        assert_eq!(InstrumentTypes::OSCILLOSCOPE.bits(), 1);
        assert!(InstrumentTypes::OSCILLOSCOPE.contains(InstrumentTypes::OSCILLOSCOPE));
        assert!(!InstrumentTypes::OSCILLOSCOPE.contains(InstrumentTypes::MULTIMETER));
    }
}
