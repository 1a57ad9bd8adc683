//! Storage-pressure pruning
//!
//! Each record array is halved independently, oldest half first, once it
//! grows past its threshold. Only the "newest half survives" property is
//! guaranteed.

use crate::store::TrackingBundle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PruneLimits {
    pub clicks: usize,
    pub scrolls: usize,
    pub time_on_page: usize,
}

impl Default for PruneLimits {
    fn default() -> Self {
        Self {
            clicks: 20,
            scrolls: 20,
            time_on_page: 10,
        }
    }
}

/// Prune `bundle` in place. Returns the number of records dropped.
pub fn prune_bundle(bundle: &mut TrackingBundle, limits: &PruneLimits) -> usize {
    drop_oldest_half(&mut bundle.clicks, limits.clicks)
        + drop_oldest_half(&mut bundle.scrolls, limits.scrolls)
        + drop_oldest_half(&mut bundle.time_on_page, limits.time_on_page)
}

fn drop_oldest_half<T>(records: &mut Vec<T>, threshold: usize) -> usize {
    if records.len() <= threshold {
        return 0;
    }

    let dropped = records.len() / 2;
    records.drain(..dropped);
    dropped
}
