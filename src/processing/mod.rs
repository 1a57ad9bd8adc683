//! Processing of buffered telemetry
//!
//! Turns stored records into renderer-ready heatmap points and summary
//! statistics for inspection views.

pub mod heatmap;
pub mod stats;

pub use heatmap::{
    clear_heatmap, load_existing_clicks, points_from_clicks, HeatmapData, HeatmapPoint,
    HeatmapRenderer, PointSpace,
};
pub use stats::BundleStats;
