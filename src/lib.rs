//! Click Scroll Scribe - lightweight interaction telemetry for web pages.
//!
//! Captures clicks, scroll depth milestones and time on page, buffers them in
//! a durable local store and ships them to a collector in periodic batches.

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod processing;
pub mod recorder;
pub mod store;

pub use config::TrackerConfig;
pub use dispatch::{BatchDispatcher, HttpTransport, Transport};
pub use recorder::{Tracker, TrackerError, TrackerResult, TrackingControl};
pub use store::{FileStorage, LocalStore, MemoryStorage, TrackingBundle};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default tracing subscriber.
///
/// Honors `RUST_LOG`; safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "click_scroll_scribe=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::debug!("Click Scroll Scribe v{}", env!("CARGO_PKG_VERSION"));
}
