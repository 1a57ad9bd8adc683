//! Time-on-page capture
//!
//! Periodic records land on exact multiples of the record interval; the
//! unload record carries `finalVisit` and is also pushed out through the
//! transport's beacon primitive.

use crate::capture::input::types::TimeRecord;
use crate::capture::signal::Signal;
use crate::dispatch::transport::{CollectorPayload, PageContext, Transport};
use crate::recorder::channel::{CaptureChannel, ChannelReaction, ChannelType};
use crate::recorder::context::TrackingContext;
use crate::store::TrackedRecord;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_RECORD_INTERVAL_SECS: u64 = 30;

pub struct TimeOnPageChannel {
    id: String,
    page_entry: Instant,
    record_interval_secs: u64,
    transport: Arc<dyn Transport>,
    page: PageContext,
    captured: usize,
}

impl TimeOnPageChannel {
    pub fn new(
        page_entry: Instant,
        record_interval_secs: u64,
        transport: Arc<dyn Transport>,
        page: PageContext,
    ) -> Self {
        Self {
            id: "time-on-page".to_string(),
            page_entry,
            record_interval_secs: record_interval_secs.max(1),
            transport,
            page,
            captured: 0,
        }
    }

    /// Whole seconds since page entry
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.page_entry).as_secs()
    }

    fn on_tick(&mut self, at: Instant, ctx: &TrackingContext) -> ChannelReaction {
        if !ctx.is_enabled() {
            return ChannelReaction::Ignored;
        }

        let seconds = self.elapsed_secs(at);
        if seconds == 0 || seconds % self.record_interval_secs != 0 {
            return ChannelReaction::Ignored;
        }

        ctx.record(TrackedRecord::Time(TimeRecord {
            seconds,
            final_visit: None,
            timestamp: Utc::now(),
        }));
        self.captured += 1;
        ChannelReaction::Recorded(1)
    }

    fn on_unload(&mut self, at: Instant, ctx: &TrackingContext) -> ChannelReaction {
        if !ctx.is_enabled() {
            return ChannelReaction::Ignored;
        }

        let seconds = self.elapsed_secs(at);
        if seconds < 1 {
            return ChannelReaction::Ignored;
        }

        ctx.record(TrackedRecord::Time(TimeRecord {
            seconds,
            final_visit: Some(true),
            timestamp: Utc::now(),
        }));
        self.captured += 1;

        let payload = CollectorPayload::page_exit(ctx.snapshot(), &self.page);
        if !self.transport.send_beacon(payload) {
            tracing::debug!("Unload beacon not supported; final data stays in local storage");
        }

        ChannelReaction::Recorded(1)
    }
}

impl CaptureChannel for TimeOnPageChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::TimeOnPage
    }

    fn on_signal(&mut self, signal: &Signal, ctx: &TrackingContext) -> ChannelReaction {
        match signal {
            Signal::Tick { at } => self.on_tick(*at, ctx),
            Signal::Unload { at } => self.on_unload(*at, ctx),
            _ => ChannelReaction::Ignored,
        }
    }

    fn records_captured(&self) -> usize {
        self.captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::transport::DeliveryResult;
    use crate::recorder::context::TrackingControl;
    use crate::store::{LocalStore, MemoryStorage, PruneLimits, DEFAULT_STORAGE_KEY};
    use async_trait::async_trait;
    use parking_lot::Mutex as ParkingMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct BeaconRecorder {
        beacons: ParkingMutex<Vec<CollectorPayload>>,
    }

    #[async_trait]
    impl Transport for BeaconRecorder {
        async fn send(&self, _payload: &CollectorPayload) -> DeliveryResult<()> {
            Ok(())
        }

        fn send_beacon(&self, payload: CollectorPayload) -> bool {
            self.beacons.lock().push(payload);
            true
        }
    }

    fn context() -> TrackingContext {
        let store = LocalStore::new(
            Arc::new(MemoryStorage::new()),
            DEFAULT_STORAGE_KEY,
            PruneLimits::default(),
        );
        TrackingContext::new(TrackingControl::default(), store)
    }

    fn channel(entry: Instant, transport: Arc<BeaconRecorder>) -> TimeOnPageChannel {
        TimeOnPageChannel::new(
            entry,
            DEFAULT_RECORD_INTERVAL_SECS,
            transport,
            PageContext {
                page_url: "https://blog.example/post".to_string(),
                user_agent: "test".to_string(),
            },
        )
    }

    #[test]
    fn test_periodic_records_on_interval_boundaries() {
        let ctx = context();
        let entry = Instant::now();
        let mut channel = channel(entry, Arc::new(BeaconRecorder::default()));

        for i in 1..=95 {
            channel.on_signal(&Signal::Tick { at: entry + Duration::from_secs(i) }, &ctx);
        }

        let seconds: Vec<u64> = ctx.snapshot().time_on_page.iter().map(|t| t.seconds).collect();
        assert_eq!(seconds, vec![30, 60, 90]);
        assert!(ctx.snapshot().time_on_page.iter().all(|t| !t.is_final()));
    }

    #[test]
    fn test_zero_elapsed_tick_ignored() {
        let ctx = context();
        let entry = Instant::now();
        let mut channel = channel(entry, Arc::new(BeaconRecorder::default()));

        let reaction = channel.on_signal(&Signal::Tick { at: entry + Duration::from_millis(900) }, &ctx);
        assert_eq!(reaction, ChannelReaction::Ignored);
    }

    #[test]
    fn test_unload_records_final_visit_and_beacons() {
        let ctx = context();
        let entry = Instant::now();
        let transport = Arc::new(BeaconRecorder::default());
        let mut channel = channel(entry, transport.clone());

        let reaction = channel.on_signal(&Signal::Unload { at: entry + Duration::from_secs(42) }, &ctx);
        assert_eq!(reaction, ChannelReaction::Recorded(1));

        let bundle = ctx.snapshot();
        assert_eq!(bundle.time_on_page[0].seconds, 42);
        assert!(bundle.time_on_page[0].is_final());

        let beacons = transport.beacons.lock();
        assert_eq!(beacons.len(), 1);
        assert_eq!(beacons[0].event.as_deref(), Some("page_exit"));
        assert_eq!(beacons[0].data, bundle);
        assert_eq!(beacons[0].page_url, "https://blog.example/post");
    }

    #[test]
    fn test_quick_unload_sends_nothing() {
        let ctx = context();
        let entry = Instant::now();
        let transport = Arc::new(BeaconRecorder::default());
        let mut channel = channel(entry, transport.clone());

        channel.on_signal(&Signal::Unload { at: entry + Duration::from_millis(400) }, &ctx);

        assert!(ctx.snapshot().is_empty());
        assert!(transport.beacons.lock().is_empty());
    }

    #[test]
    fn test_disabled_unload_sends_nothing() {
        let ctx = context();
        ctx.control().disable_tracking();
        let entry = Instant::now();
        let transport = Arc::new(BeaconRecorder::default());
        let mut channel = channel(entry, transport.clone());

        channel.on_signal(&Signal::Tick { at: entry + Duration::from_secs(30) }, &ctx);
        channel.on_signal(&Signal::Unload { at: entry + Duration::from_secs(31) }, &ctx);

        assert!(ctx.snapshot().is_empty());
        assert!(transport.beacons.lock().is_empty());
    }
}
