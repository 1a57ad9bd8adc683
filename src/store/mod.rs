//! Local store: the live tracking bundle and its durable mirror
//!
//! The store is the single owner of the `TrackingBundle` for a page session.
//! Every append is followed by a durable write of the whole bundle; storage
//! failures are logged and swallowed so capture never blocks the page.

pub mod prune;
pub mod storage;

use crate::capture::input::types::{ClickRecord, ScrollRecord, TimeRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use prune::{prune_bundle, PruneLimits};
pub use storage::{DurableStorage, FileStorage, MemoryStorage, StorageError, StorageResult};

pub const DEFAULT_STORAGE_KEY: &str = "trackingData";

/// Every buffered record of the session; the unit of persistence and transmission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingBundle {
    pub clicks: Vec<ClickRecord>,
    pub scrolls: Vec<ScrollRecord>,
    pub time_on_page: Vec<TimeRecord>,
}

impl TrackingBundle {
    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty() && self.scrolls.is_empty() && self.time_on_page.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clicks.len() + self.scrolls.len() + self.time_on_page.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackedRecord {
    Click(ClickRecord),
    Scroll(ScrollRecord),
    Time(TimeRecord),
}

/// Result of a durable write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved,
    /// The first write hit the quota; pruning made room.
    SavedAfterPrune,
    /// The bundle could not be written. Only the durable copy is stale.
    Dropped,
}

/// Array lengths of a snapshot, used to remove exactly what was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotMark {
    pub clicks: usize,
    pub scrolls: usize,
    pub time_on_page: usize,
    prune_epoch: u64,
}

pub struct LocalStore {
    storage: Arc<dyn DurableStorage>,
    key: String,
    limits: PruneLimits,
    bundle: TrackingBundle,
    /// Bumped whenever pruning removes records; invalidates older marks.
    prune_epoch: u64,
}

impl LocalStore {
    /// Empty store; call `initialize` to restore the durable snapshot.
    pub fn new(storage: Arc<dyn DurableStorage>, key: impl Into<String>, limits: PruneLimits) -> Self {
        Self {
            storage,
            key: key.into(),
            limits,
            bundle: TrackingBundle::default(),
            prune_epoch: 0,
        }
    }

    /// Construct and restore in one step.
    pub fn open(storage: Arc<dyn DurableStorage>, key: impl Into<String>, limits: PruneLimits) -> Self {
        let mut store = Self::new(storage, key, limits);
        store.initialize();
        store
    }

    /// Restore the bundle from durable storage.
    ///
    /// A missing, unreadable or corrupted snapshot yields an empty bundle.
    pub fn initialize(&mut self) {
        self.bundle = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<TrackingBundle>(&raw) {
                Ok(bundle) => {
                    tracing::debug!(
                        "Restored tracking data (clicks={}, scrolls={}, timeOnPage={})",
                        bundle.clicks.len(),
                        bundle.scrolls.len(),
                        bundle.time_on_page.len()
                    );
                    bundle
                }
                Err(e) => {
                    tracing::error!("Error parsing stored tracking data: {}", e);
                    TrackingBundle::default()
                }
            },
            Ok(None) => TrackingBundle::default(),
            Err(e) => {
                tracing::error!("Error reading stored tracking data: {}", e);
                TrackingBundle::default()
            }
        };
    }

    /// Re-read the durable snapshot, discarding the in-memory bundle.
    pub fn reload(&mut self) {
        self.initialize();
        self.prune_epoch += 1;
    }

    pub fn append(&mut self, record: TrackedRecord) {
        match record {
            TrackedRecord::Click(click) => self.bundle.clicks.push(click.with_finite_geometry()),
            TrackedRecord::Scroll(scroll) => self.bundle.scrolls.push(scroll),
            TrackedRecord::Time(time) => self.bundle.time_on_page.push(time),
        }
    }

    /// Append then persist; the path every capturer goes through.
    pub fn record(&mut self, record: TrackedRecord) -> PersistOutcome {
        self.append(record);
        self.persist()
    }

    /// Write the whole bundle durably.
    ///
    /// On quota exhaustion the bundle is pruned and the write retried once.
    pub fn persist(&mut self) -> PersistOutcome {
        let err = match self.write_snapshot() {
            Ok(()) => return PersistOutcome::Saved,
            Err(e) => e,
        };

        tracing::error!("Error saving tracking data: {}", err);
        if !err.is_quota_exceeded() {
            return PersistOutcome::Dropped;
        }

        let dropped = self.prune();
        tracing::warn!("Storage quota exceeded; pruned {} old records", dropped);

        match self.write_snapshot() {
            Ok(()) => PersistOutcome::SavedAfterPrune,
            Err(e) => {
                tracing::error!("Still unable to save tracking data after pruning: {}", e);
                PersistOutcome::Dropped
            }
        }
    }

    /// Halve oversized arrays, dropping the oldest records.
    pub fn prune(&mut self) -> usize {
        let dropped = prune_bundle(&mut self.bundle, &self.limits);
        if dropped > 0 {
            self.prune_epoch += 1;
        }
        dropped
    }

    /// Empty the bundle and remove the durable snapshot.
    pub fn clear(&mut self) {
        self.bundle = TrackingBundle::default();
        self.prune_epoch += 1;
        if let Err(e) = self.storage.remove_item(&self.key) {
            tracing::error!("Error removing stored tracking data: {}", e);
        }
    }

    pub fn bundle(&self) -> &TrackingBundle {
        &self.bundle
    }

    /// Deep copy of the bundle, safe to hand to an in-flight send.
    pub fn snapshot(&self) -> TrackingBundle {
        self.bundle.clone()
    }

    pub fn snapshot_with_mark(&self) -> (TrackingBundle, SnapshotMark) {
        let mark = SnapshotMark {
            clicks: self.bundle.clicks.len(),
            scrolls: self.bundle.scrolls.len(),
            time_on_page: self.bundle.time_on_page.len(),
            prune_epoch: self.prune_epoch,
        };
        (self.snapshot(), mark)
    }

    /// Remove the records covered by `mark` after a confirmed delivery.
    ///
    /// Returns `false`, removing nothing, if pruning or clearing changed the
    /// arrays since the mark was taken.
    pub fn drain_delivered(&mut self, mark: &SnapshotMark) -> bool {
        if mark.prune_epoch != self.prune_epoch
            || mark.clicks > self.bundle.clicks.len()
            || mark.scrolls > self.bundle.scrolls.len()
            || mark.time_on_page > self.bundle.time_on_page.len()
        {
            return false;
        }

        self.bundle.clicks.drain(..mark.clicks);
        self.bundle.scrolls.drain(..mark.scrolls);
        self.bundle.time_on_page.drain(..mark.time_on_page);
        self.persist();
        true
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn limits(&self) -> &PruneLimits {
        &self.limits
    }

    fn write_snapshot(&self) -> StorageResult<()> {
        let serialized = serde_json::to_string(&self.bundle)?;
        self.storage.set_item(&self.key, &serialized)
    }
}
