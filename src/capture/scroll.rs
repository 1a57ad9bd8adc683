//! Scroll depth milestones
//!
//! `MilestoneTracker` is the pure part: it remembers which thresholds have
//! fired. `ScrollDepthChannel` throttles scroll signals and evaluates the
//! latest geometry once the throttle delay elapses.

use crate::capture::input::types::ScrollRecord;
use crate::capture::signal::{ScrollGeometry, Signal};
use crate::recorder::channel::{CaptureChannel, ChannelReaction, ChannelType};
use crate::recorder::context::TrackingContext;
use crate::store::TrackedRecord;
use chrono::Utc;
use std::time::Duration;

pub const DEFAULT_MILESTONES: [u32; 4] = [25, 50, 75, 100];
pub const DEFAULT_SCROLL_THROTTLE: Duration = Duration::from_millis(100);

/// Fires each milestone at most once.
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    /// Ascending milestones paired with their reached flag
    milestones: Vec<(u32, bool)>,
}

impl MilestoneTracker {
    pub fn new(milestones: &[u32]) -> Self {
        let mut sorted = milestones.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Self {
            milestones: sorted.into_iter().map(|m| (m, false)).collect(),
        }
    }

    /// Tracker whose flags are already set for every percentage in `recorded`.
    pub fn seeded(milestones: &[u32], recorded: &[ScrollRecord]) -> Self {
        let mut tracker = Self::new(milestones);
        for (milestone, reached) in tracker.milestones.iter_mut() {
            *reached = recorded.iter().any(|r| r.percentage == *milestone);
        }
        tracker
    }

    /// Mark and return every milestone newly reached at `percentage`, ascending.
    pub fn observe(&mut self, percentage: u32) -> Vec<u32> {
        let mut fired = Vec::new();
        for (milestone, reached) in self.milestones.iter_mut() {
            if percentage >= *milestone && !*reached {
                *reached = true;
                fired.push(*milestone);
            }
        }
        fired
    }

    pub fn is_reached(&self, milestone: u32) -> bool {
        self.milestones
            .iter()
            .any(|(m, reached)| *m == milestone && *reached)
    }

    pub fn all_reached(&self) -> bool {
        self.milestones.iter().all(|(_, reached)| *reached)
    }
}

pub struct ScrollDepthChannel {
    id: String,
    tracker: MilestoneTracker,
    throttle: Duration,
    pending: bool,
    latest: Option<ScrollGeometry>,
    captured: usize,
}

impl ScrollDepthChannel {
    pub fn new(tracker: MilestoneTracker, throttle: Duration) -> Self {
        Self {
            id: "scroll-depth".to_string(),
            tracker,
            throttle,
            pending: false,
            latest: None,
            captured: 0,
        }
    }

    pub fn tracker(&self) -> &MilestoneTracker {
        &self.tracker
    }
}

impl CaptureChannel for ScrollDepthChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::ScrollDepth
    }

    fn on_signal(&mut self, signal: &Signal, ctx: &TrackingContext) -> ChannelReaction {
        let Signal::Scroll(geometry) = signal else {
            return ChannelReaction::Ignored;
        };

        if !ctx.is_enabled() {
            return ChannelReaction::Ignored;
        }

        // The evaluation reads whatever geometry is current when it runs
        self.latest = Some(*geometry);

        if self.pending {
            return ChannelReaction::Ignored;
        }
        self.pending = true;
        ChannelReaction::Deferred(self.throttle)
    }

    fn on_timer(&mut self, ctx: &TrackingContext) -> ChannelReaction {
        self.pending = false;

        let Some(geometry) = self.latest else {
            return ChannelReaction::Ignored;
        };
        if !ctx.is_enabled() {
            return ChannelReaction::Ignored;
        }

        let percentage = geometry.percentage();
        let fired = self.tracker.observe(percentage);

        for milestone in &fired {
            tracing::debug!("Scroll milestone {}% reached (at {}%)", milestone, percentage);
            ctx.record(TrackedRecord::Scroll(ScrollRecord {
                percentage: *milestone,
                timestamp: Utc::now(),
            }));
        }

        self.captured += fired.len();
        if fired.is_empty() {
            ChannelReaction::Ignored
        } else {
            ChannelReaction::Recorded(fired.len())
        }
    }

    fn records_captured(&self) -> usize {
        self.captured
    }
}
