//! Session persistence for the CSV stream driver.
//!
//! A saved session records which channels existed and the identifier each one was saved
//! under, so other saved objects (plots, filters, triggers) can refer back to them. Names and
//! units are not persisted: the stream itself re-announces them with `CSV-NAME` / `CSV-UNIT`.
//!
//! ## Format
//!
//! ```yaml
//! driver: csvstream
//! channels:
//!   ch0:
//!     index: 0
//!     id: 17
//!   ch5:
//!     index: 5
//!     id: 18
//! ```
//!
//! ## Functionality
//!
//! - **`save_session`** / **`load_session`**: YAML round trip through a file.
//! - **`InstrumentSession::from_instrument`**: snapshot the current channel list.
//! - **`InstrumentSession::preload`**: rebuild channel identities on a fresh instrument before
//!   acquisition starts, growing the channel list to the highest saved index and registering
//!   each saved channel in an [`IdTable`].

use crate::channel::Channel;
use crate::error::{AppResult, DaqError};
use crate::instrument::{CsvStreamInstrument, DRIVER_NAME};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Highest channel count a session may ask for.
pub const MAX_SESSION_CHANNELS: usize = 1024;

/// Saved identity of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChannel {
    /// Position in the channel list
    pub index: usize,
    /// Identifier other saved objects use to refer to the channel
    pub id: u64,
}

/// Saved state of one CSV stream instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSession {
    /// Name of the driver that wrote the session
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Saved channels, keyed by `ch<index>`
    #[serde(default)]
    pub channels: BTreeMap<String, SessionChannel>,
}

fn default_driver() -> String {
    DRIVER_NAME.to_string()
}

/// Maps saved identifiers to live channels while a session is being loaded.
#[derive(Debug, Default)]
pub struct IdTable {
    entries: HashMap<u64, Arc<Channel>>,
}

impl IdTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `channel` under `id`.
    ///
    /// The first registration of an id wins; returns `false` if `id` was already taken.
    pub fn emplace(&mut self, id: u64, channel: Arc<Channel>) -> bool {
        match self.entries.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(channel);
                true
            }
        }
    }

    /// Channel registered under `id`.
    pub fn get(&self, id: u64) -> Option<&Arc<Channel>> {
        self.entries.get(&id)
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InstrumentSession {
    /// Snapshot every channel of `instrument`, numbering ids from `first_id`.
    pub fn from_instrument(instrument: &CsvStreamInstrument, first_id: u64) -> Self {
        let channels = instrument
            .channels()
            .iter()
            .zip(first_id..)
            .map(|(channel, id)| {
                (
                    format!("ch{}", channel.index()),
                    SessionChannel {
                        index: channel.index(),
                        id,
                    },
                )
            })
            .collect();

        Self {
            driver: DRIVER_NAME.to_string(),
            channels,
        }
    }

    /// Highest channel index referenced by the session.
    pub fn max_channel_index(&self) -> Option<usize> {
        self.channels.values().map(|c| c.index).max()
    }

    /// Rebuild channel identities on `instrument` and register them in `ids`.
    ///
    /// Must run before acquisition starts. Channels are only ever added, never removed.
    pub fn preload(
        &self,
        instrument: &mut CsvStreamInstrument,
        ids: &mut IdTable,
    ) -> AppResult<()> {
        if self.driver != DRIVER_NAME {
            return Err(DaqError::SessionFormat(format!(
                "session was saved by driver '{}', expected '{}'",
                self.driver, DRIVER_NAME
            )));
        }

        if let Some(max) = self.max_channel_index() {
            let count = max
                .checked_add(1)
                .filter(|&count| count <= MAX_SESSION_CHANNELS)
                .ok_or_else(|| {
                    DaqError::SessionFormat(format!(
                        "channel index {} exceeds the limit of {} channels",
                        max, MAX_SESSION_CHANNELS
                    ))
                })?;
            instrument.ensure_channel_count(count);
        }

        for (key, saved) in &self.channels {
            let Some(channel) = instrument.channel(saved.index) else {
                continue;
            };
            if !ids.emplace(saved.id, Arc::clone(channel)) {
                warn!(
                    key = key.as_str(),
                    id = saved.id,
                    "duplicate channel id in session, keeping first"
                );
            }
        }

        info!(
            channels = instrument.channel_count(),
            registered = ids.len(),
            "session channel identities restored"
        );
        Ok(())
    }
}

/// Saves a session to a YAML file.
pub fn save_session(session: &InstrumentSession, path: &Path) -> AppResult<()> {
    let yaml = serde_yaml::to_string(session)?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Loads a session from a YAML file.
pub fn load_session(path: &Path) -> AppResult<InstrumentSession> {
    let yaml = fs::read_to_string(path)?;
    let session = serde_yaml::from_str(&yaml)?;
    Ok(session)
}
