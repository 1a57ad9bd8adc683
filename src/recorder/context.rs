//! Shared tracking context
//!
//! One `TrackingContext` per pipeline. It bundles the control switch with the
//! local store and is cloned (cheaply, by handle) into every capturer and the
//! dispatcher. The store lock is only ever taken for synchronous work.

use crate::store::{LocalStore, PersistOutcome, SnapshotMark, TrackedRecord, TrackingBundle};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The externally visible enable/disable switch.
///
/// Toggling only gates future capture and delivery; buffered data is kept.
#[derive(Debug, Clone)]
pub struct TrackingControl {
    enabled: Arc<AtomicBool>,
}

impl TrackingControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn disable_tracking(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::info!("Tracking disabled");
    }

    pub fn enable_tracking(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::info!("Tracking enabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl Default for TrackingControl {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Clone)]
pub struct TrackingContext {
    control: TrackingControl,
    store: Arc<ParkingMutex<LocalStore>>,
}

impl TrackingContext {
    pub fn new(control: TrackingControl, store: LocalStore) -> Self {
        Self {
            control,
            store: Arc::new(ParkingMutex::new(store)),
        }
    }

    pub fn control(&self) -> &TrackingControl {
        &self.control
    }

    pub fn is_enabled(&self) -> bool {
        self.control.is_enabled()
    }

    /// Append a record and persist the bundle.
    pub fn record(&self, record: TrackedRecord) -> PersistOutcome {
        self.store.lock().record(record)
    }

    pub fn snapshot(&self) -> TrackingBundle {
        self.store.lock().snapshot()
    }

    pub fn snapshot_with_mark(&self) -> (TrackingBundle, SnapshotMark) {
        self.store.lock().snapshot_with_mark()
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// `f` must not block; the lock is shared with every capturer.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut LocalStore) -> R) -> R {
        f(&mut self.store.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::types::ScrollRecord;
    use crate::store::{MemoryStorage, PruneLimits, DEFAULT_STORAGE_KEY};
    use chrono::Utc;

    #[test]
    fn test_control_toggles() {
        let control = TrackingControl::default();
        assert!(control.is_enabled());

        let shared = control.clone();
        shared.disable_tracking();
        assert!(!control.is_enabled());

        control.enable_tracking();
        assert!(shared.is_enabled());
    }

    #[test]
    fn test_toggle_keeps_buffered_data() {
        let store = LocalStore::new(
            Arc::new(MemoryStorage::new()),
            DEFAULT_STORAGE_KEY,
            PruneLimits::default(),
        );
        let ctx = TrackingContext::new(TrackingControl::default(), store);
        ctx.record(TrackedRecord::Scroll(ScrollRecord {
            percentage: 25,
            timestamp: Utc::now(),
        }));

        ctx.control().disable_tracking();
        ctx.control().enable_tracking();

        assert_eq!(ctx.snapshot().scrolls.len(), 1);
    }
}
