//! Page interaction capture
//!
//! Each capture concern is a `CaptureChannel` fed from the same signal
//! stream: clicks, scroll depth milestones, time on page and clicks relayed
//! from embedded frames.

pub mod frame;
pub mod input;
pub mod scroll;
pub mod signal;
pub mod time;

pub use frame::FrameMessageChannel;
pub use input::ClickChannel;
pub use scroll::{MilestoneTracker, ScrollDepthChannel};
pub use signal::{ClickSignal, ElementNode, ScrollGeometry, Signal, SignalSource};
pub use time::TimeOnPageChannel;
