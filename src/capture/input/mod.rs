//! Click capture
//!
//! Implements a `CaptureChannel` that records debounced clicks with their
//! viewport, percentage and document coordinates plus a short description
//! of the clicked element.

pub mod channel;
pub mod element;
pub mod types;

pub use channel::ClickChannel;
pub use element::describe_element;
pub use types::{ClickRecord, ClickSource, ElementDescriptor, ElementInfo, ScrollRecord, TimeRecord};
