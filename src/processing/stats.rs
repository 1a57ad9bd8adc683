use crate::capture::input::types::ClickSource;
use crate::store::TrackingBundle;
use serde::Serialize;

/// Summary of a tracking bundle for inspection views
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    pub click_count: usize,
    pub iframe_click_count: usize,
    pub scroll_count: usize,
    /// Deepest recorded milestone, if any
    pub max_scroll_depth: Option<u32>,
    pub time_entry_count: usize,
    /// Longest recorded time on page in seconds, if any
    pub max_time_on_page: Option<u64>,
}

impl BundleStats {
    pub fn from_bundle(bundle: &TrackingBundle) -> Self {
        Self {
            click_count: bundle.clicks.len(),
            iframe_click_count: bundle
                .clicks
                .iter()
                .filter(|c| c.source == Some(ClickSource::Iframe))
                .count(),
            scroll_count: bundle.scrolls.len(),
            max_scroll_depth: bundle.scrolls.iter().map(|s| s.percentage).max(),
            time_entry_count: bundle.time_on_page.len(),
            max_time_on_page: bundle.time_on_page.iter().map(|t| t.seconds).max(),
        }
    }
}
