use crate::capture::input::element::describe_element;
use crate::capture::input::types::ClickRecord;
use crate::capture::signal::{ClickSignal, Signal};
use crate::recorder::channel::{CaptureChannel, ChannelReaction, ChannelType};
use crate::recorder::context::TrackingContext;
use crate::store::TrackedRecord;
use chrono::Utc;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// First-party click capture with debouncing.
pub struct ClickChannel {
    id: String,
    debounce: Duration,
    selector_max_depth: usize,
    identifier_text_limit: usize,
    last_accepted: Option<Instant>,
    captured: usize,
}

impl ClickChannel {
    pub fn new(debounce: Duration, selector_max_depth: usize, identifier_text_limit: usize) -> Self {
        Self {
            id: "click".to_string(),
            debounce,
            selector_max_depth,
            identifier_text_limit,
            last_accepted: None,
            captured: 0,
        }
    }

    /// Whether a click at `at` falls outside the debounce window.
    fn accepts(&self, at: Instant) -> bool {
        match self.last_accepted {
            None => true,
            // A clock running backwards counts as inside the window
            Some(last) => at
                .checked_duration_since(last)
                .map(|elapsed| elapsed >= self.debounce)
                .unwrap_or(false),
        }
    }

    fn build_record(&self, click: &ClickSignal) -> ClickRecord {
        let total_height = if click.document_height > 0.0 {
            click.document_height
        } else {
            click.viewport_height
        };

        ClickRecord {
            x: click.client_x,
            y: click.client_y,
            x_percent: Some(percent_of(click.page_x, click.viewport_width)),
            y_percent: Some(percent_of(click.page_y, total_height)),
            page_x: click.page_x,
            page_y: click.page_y,
            element: describe_element(&click.path, self.selector_max_depth, self.identifier_text_limit),
            timestamp: Utc::now(),
            source: None,
        }
        .with_finite_geometry()
    }
}

impl CaptureChannel for ClickChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Click
    }

    fn on_signal(&mut self, signal: &Signal, ctx: &TrackingContext) -> ChannelReaction {
        let Signal::Click(click) = signal else {
            return ChannelReaction::Ignored;
        };

        if !ctx.is_enabled() {
            return ChannelReaction::Ignored;
        }

        if !self.accepts(click.at) {
            tracing::trace!("Click debounced");
            return ChannelReaction::Ignored;
        }
        self.last_accepted = Some(click.at);

        let record = self.build_record(click);
        ctx.record(TrackedRecord::Click(record));
        self.captured += 1;

        ChannelReaction::Recorded(1)
    }

    fn records_captured(&self) -> usize {
        self.captured
    }
}

/// `value / total` as a percentage with two decimals; 0 for degenerate geometry.
pub fn percent_of(value: f64, total: f64) -> f64 {
    if total <= 0.0 || !total.is_finite() || !value.is_finite() {
        return 0.0;
    }
    round2(value / total * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
