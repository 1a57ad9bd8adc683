//! Capture channel trait
//!
//! Defines the interface every capturer (click, scroll, time, frame) implements
//! and the errors the tracking pipeline can surface.

use crate::capture::signal::Signal;
use crate::dispatch::transport::DeliveryError;
use crate::recorder::context::TrackingContext;
use crate::store::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while setting up or running the tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracking disabled: user consent not provided")]
    ConsentNotGiven,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// What a channel did with a signal or timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelReaction {
    /// Not for this channel, gated off, or suppressed
    Ignored,
    /// This many records were appended to the store
    Recorded(usize),
    /// Call `on_timer` after this delay
    Deferred(Duration),
}

/// Trait for capture channels
///
/// Each channel turns one class of signal into records. Channels are owned by
/// the `Tracker` and driven from its event loop, one call at a time.
pub trait CaptureChannel: Send {
    /// Channel identifier (e.g. "click", "scroll-depth")
    fn id(&self) -> &str;

    fn channel_type(&self) -> ChannelType;

    /// Handle one signal. Channels ignore signal kinds they do not track.
    fn on_signal(&mut self, signal: &Signal, ctx: &TrackingContext) -> ChannelReaction;

    /// A delay requested through `ChannelReaction::Deferred` has elapsed.
    fn on_timer(&mut self, _ctx: &TrackingContext) -> ChannelReaction {
        ChannelReaction::Ignored
    }

    /// Records appended by this channel since construction
    fn records_captured(&self) -> usize;
}

/// Types of capture channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// First-party pointer clicks
    Click,
    /// Scroll depth milestones
    ScrollDepth,
    /// Time on page
    TimeOnPage,
    /// Clicks relayed from embedded frames
    Frame,
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Click => write!(f, "click"),
            ChannelType::ScrollDepth => write!(f, "scroll-depth"),
            ChannelType::TimeOnPage => write!(f, "time-on-page"),
            ChannelType::Frame => write!(f, "frame"),
        }
    }
}
