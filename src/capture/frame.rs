//! Clicks relayed from embedded frames
//!
//! A frame posts `{type: "iframe-click", data: {...}}` to the host page. The
//! payload is taken as a click record, tagged with `source: "iframe"`, and
//! stored like any first-party click. Frame clicks are not debounced.

use crate::capture::input::types::{ClickRecord, ClickSource};
use crate::capture::signal::Signal;
use crate::recorder::channel::{CaptureChannel, ChannelReaction, ChannelType};
use crate::recorder::context::TrackingContext;
use crate::store::TrackedRecord;
use serde::Deserialize;

pub const IFRAME_CLICK_MESSAGE: &str = "iframe-click";

#[derive(Debug, Deserialize)]
struct FrameMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub struct FrameMessageChannel {
    id: String,
    captured: usize,
}

impl FrameMessageChannel {
    pub fn new() -> Self {
        Self {
            id: "frame".to_string(),
            captured: 0,
        }
    }
}

impl Default for FrameMessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureChannel for FrameMessageChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Frame
    }

    fn on_signal(&mut self, signal: &Signal, ctx: &TrackingContext) -> ChannelReaction {
        let Signal::Message(message) = signal else {
            return ChannelReaction::Ignored;
        };

        // Unrelated postMessage traffic is common; skip it quietly
        let Ok(message) = FrameMessage::deserialize(message) else {
            return ChannelReaction::Ignored;
        };
        if message.kind != IFRAME_CLICK_MESSAGE {
            return ChannelReaction::Ignored;
        }

        if !ctx.is_enabled() {
            return ChannelReaction::Ignored;
        }

        let mut record = match ClickRecord::deserialize(&message.data) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Dropping malformed iframe click: {}", e);
                return ChannelReaction::Ignored;
            }
        };
        record.source = Some(ClickSource::Iframe);

        tracing::debug!("Tracked click from iframe at ({}, {})", record.x, record.y);
        ctx.record(TrackedRecord::Click(record));
        self.captured += 1;

        ChannelReaction::Recorded(1)
    }

    fn records_captured(&self) -> usize {
        self.captured
    }
}
