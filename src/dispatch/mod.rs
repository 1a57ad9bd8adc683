//! Batch dispatcher
//!
//! Periodically flushes a snapshot of the local store to the collector.
//! Every cycle ends by scheduling the next one after the batch interval,
//! whatever happened during the cycle; failed sends are retried implicitly
//! because the data is still in the store.

pub mod transport;

use crate::recorder::context::TrackingContext;
use parking_lot::Mutex as ParkingMutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub use transport::{
    CollectorPayload, DeliveryError, DeliveryResult, HttpTransport, PageContext, Transport,
};

pub const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_millis(5000);

/// What happens to records after the collector confirmed them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetentionPolicy {
    /// Keep delivered records in the store (they are sent again next cycle)
    #[default]
    Retain,
    /// Remove exactly the delivered records
    DrainDelivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Not started, stopped, or between a direct send and the next one
    Idle,
    /// Waiting for the next cycle
    Scheduled,
    /// A request is in flight
    Sending,
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// Control surface disabled; nothing sent
    Disabled,
    /// Bundle empty; nothing sent
    Empty,
    /// Collector accepted the snapshot
    Delivered { records: usize },
    /// Send failed; data stays queued
    Failed(DeliveryError),
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }
}

pub struct BatchDispatcher {
    ctx: TrackingContext,
    transport: Arc<dyn Transport>,
    page: PageContext,
    interval: Duration,
    retention: RetentionPolicy,
    state: ParkingMutex<DispatchState>,
}

impl BatchDispatcher {
    pub fn new(
        ctx: TrackingContext,
        transport: Arc<dyn Transport>,
        page: PageContext,
        interval: Duration,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            ctx,
            transport,
            page,
            interval,
            retention,
            state: ParkingMutex::new(DispatchState::Idle),
        }
    }

    pub fn state(&self) -> DispatchState {
        *self.state.lock()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one send cycle.
    ///
    /// The snapshot is cloned before the request starts, so records appended
    /// while it is in flight stay in the store for a later cycle.
    pub async fn dispatch_once(&self) -> DispatchOutcome {
        if !self.ctx.is_enabled() {
            return DispatchOutcome::Disabled;
        }

        let (data, mark) = self.ctx.snapshot_with_mark();
        if data.is_empty() {
            return DispatchOutcome::Empty;
        }

        let records = data.len();
        let payload = CollectorPayload::batch(data, &self.page);

        *self.state.lock() = DispatchState::Sending;
        let result = self.transport.send(&payload).await;
        *self.state.lock() = DispatchState::Idle;

        match result {
            Ok(()) => {
                tracing::info!("Tracking data sent successfully ({} records)", records);
                if self.retention == RetentionPolicy::DrainDelivered
                    && !self.ctx.with_store(|store| store.drain_delivered(&mark))
                {
                    tracing::debug!("Store changed during send; delivered records kept");
                }
                DispatchOutcome::Delivered { records }
            }
            Err(e) => {
                tracing::error!("Error sending tracking data: {}", e);
                DispatchOutcome::Failed(e)
            }
        }
    }

    /// Spawn the dispatch loop on the current tokio runtime.
    pub fn spawn(self: Arc<Self>) -> DispatcherHandle {
        let dispatcher = self.clone();
        let handle = tokio::spawn(async move { dispatcher.run().await });
        DispatcherHandle {
            dispatcher: self,
            handle: Some(handle),
        }
    }

    async fn run(&self) {
        tracing::debug!("Batch dispatcher started (interval={:?})", self.interval);
        loop {
            *self.state.lock() = DispatchState::Scheduled;
            tokio::time::sleep(self.interval).await;

            let outcome = self.dispatch_once().await;
            tracing::trace!("Dispatch cycle finished: {:?}", outcome);
        }
    }
}

/// Owns the spawned dispatch loop; dropping it stops the loop.
pub struct DispatcherHandle {
    dispatcher: Arc<BatchDispatcher>,
    handle: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    pub fn dispatcher(&self) -> &Arc<BatchDispatcher> {
        &self.dispatcher
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Cancel the pending cycle, including an in-flight send.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            *self.dispatcher.state.lock() = DispatchState::Idle;
            tracing::debug!("Batch dispatcher stopped");
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
