//! Tracking pipeline coordinator
//!
//! `Tracker` owns the capture channels and drives them from one event loop:
//! signals from the source, the time-on-page heartbeat and channel throttle
//! timers are handled one at a time on a single task. The batch dispatcher
//! runs beside it and only ever reads cloned snapshots.

pub mod channel;
pub mod context;

use crate::capture::frame::FrameMessageChannel;
use crate::capture::input::ClickChannel;
use crate::capture::scroll::{MilestoneTracker, ScrollDepthChannel};
use crate::capture::signal::{Signal, SignalSource};
use crate::capture::time::TimeOnPageChannel;
use crate::config::TrackerConfig;
use crate::dispatch::{BatchDispatcher, HttpTransport, Transport};
use crate::store::{DurableStorage, FileStorage, LocalStore, TrackingBundle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};

pub use channel::{CaptureChannel, ChannelReaction, ChannelType, TrackerError, TrackerResult};
pub use context::{TrackingContext, TrackingControl};

pub struct Tracker {
    config: TrackerConfig,
    ctx: TrackingContext,
    transport: Arc<dyn Transport>,
    channels: Vec<Box<dyn CaptureChannel>>,
}

impl Tracker {
    /// Restore the local store and build the default channels.
    ///
    /// Fails with `ConsentNotGiven` when consent was explicitly refused.
    pub fn initialize(
        config: TrackerConfig,
        storage: Arc<dyn DurableStorage>,
        transport: Arc<dyn Transport>,
    ) -> TrackerResult<Self> {
        if config.consent_given == Some(false) {
            tracing::info!("Tracking disabled: user consent not provided");
            return Err(TrackerError::ConsentNotGiven);
        }
        let config = config.validated()?;

        tracing::info!("Initializing click-scroll-scribe tracking...");

        let store = LocalStore::open(storage, config.storage_key.clone(), config.prune);
        let control = TrackingControl::new(!config.start_disabled);

        let milestones = if config.restore_milestones {
            MilestoneTracker::seeded(&config.scroll_milestones, &store.bundle().scrolls)
        } else {
            MilestoneTracker::new(&config.scroll_milestones)
        };

        let ctx = TrackingContext::new(control, store);

        let channels: Vec<Box<dyn CaptureChannel>> = vec![
            Box::new(ClickChannel::new(
                config.debounce(),
                config.selector_max_depth,
                config.identifier_text_limit,
            )),
            Box::new(ScrollDepthChannel::new(milestones, config.scroll_throttle())),
            Box::new(TimeOnPageChannel::new(
                Instant::now().into_std(),
                config.time_record_interval_secs,
                transport.clone(),
                config.page_context(),
            )),
            Box::new(FrameMessageChannel::new()),
        ];

        if config.start_disabled {
            tracing::info!("Tracking initialized but disabled by configuration");
        } else {
            tracing::info!("Tracking initialized and active");
        }

        Ok(Self {
            config,
            ctx,
            transport,
            channels,
        })
    }

    /// Tracker persisting under `storage_dir` and posting to `config.api_endpoint`.
    pub fn open(config: TrackerConfig, storage_dir: impl Into<PathBuf>) -> TrackerResult<Self> {
        let storage = Arc::new(FileStorage::new(storage_dir)?);
        let transport = Arc::new(HttpTransport::new(&config.api_endpoint)?);
        Self::initialize(config, storage, transport)
    }

    /// Handle for the enable/disable switch
    pub fn control(&self) -> TrackingControl {
        self.ctx.control().clone()
    }

    pub fn context(&self) -> &TrackingContext {
        &self.ctx
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn add_channel(&mut self, channel: Box<dyn CaptureChannel>) {
        tracing::debug!("Adding {} channel '{}'", channel.channel_type(), channel.id());
        self.channels.push(channel);
    }

    pub fn clear_channels(&mut self) {
        self.channels.clear();
    }

    /// Deliver one signal to every channel. Returns the number of records appended.
    fn broadcast(&mut self, signal: &Signal, deadlines: &mut [Option<Instant>]) -> usize {
        let mut recorded = 0;
        for (channel, deadline) in self.channels.iter_mut().zip(deadlines.iter_mut()) {
            match channel.on_signal(signal, &self.ctx) {
                ChannelReaction::Recorded(n) => recorded += n,
                ChannelReaction::Deferred(delay) => {
                    if deadline.is_none() {
                        *deadline = Some(Instant::now() + delay);
                    }
                }
                ChannelReaction::Ignored => {}
            }
        }
        recorded
    }

    fn fire_due_timers(&mut self, deadlines: &mut [Option<Instant>]) {
        let now = Instant::now();
        for (channel, deadline) in self.channels.iter_mut().zip(deadlines.iter_mut()) {
            if deadline.map(|d| d <= now).unwrap_or(false) {
                *deadline = None;
                if let ChannelReaction::Deferred(delay) = channel.on_timer(&self.ctx) {
                    *deadline = Some(now + delay);
                }
            }
        }
    }

    /// Run the pipeline until the page unloads or the source closes.
    ///
    /// Returns the bundle as it stands when the loop ends.
    pub async fn run<S: SignalSource>(mut self, mut source: S) -> TrackerResult<TrackingBundle> {
        let dispatcher = Arc::new(BatchDispatcher::new(
            self.ctx.clone(),
            self.transport.clone(),
            self.config.page_context(),
            self.config.batch_interval(),
            self.config.retention,
        ));
        let mut dispatcher = dispatcher.spawn();

        let tick = self.config.time_tick();
        let mut heartbeat = tokio::time::interval_at(Instant::now() + tick, tick);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut deadlines: Vec<Option<Instant>> = vec![None; self.channels.len()];

        loop {
            let next_deadline = deadlines.iter().flatten().min().copied();

            tokio::select! {
                signal = source.next_signal() => {
                    let Some(signal) = signal else {
                        tracing::info!("Signal source closed");
                        break;
                    };
                    let unloading = matches!(signal, Signal::Unload { .. });
                    self.broadcast(&signal, &mut deadlines);
                    if unloading {
                        tracing::info!("Page unloading; tracker stopped");
                        break;
                    }
                }
                scheduled = heartbeat.tick() => {
                    self.broadcast(&Signal::Tick { at: scheduled.into_std() }, &mut deadlines);
                }
                _ = sleep_until_deadline(next_deadline) => {
                    self.fire_due_timers(&mut deadlines);
                }
            }
        }

        dispatcher.stop();

        for channel in &self.channels {
            tracing::debug!(
                "{} channel '{}' captured {} records",
                channel.channel_type(),
                channel.id(),
                channel.records_captured()
            );
        }

        Ok(self.ctx.snapshot())
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
