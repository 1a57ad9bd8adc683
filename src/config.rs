//! Tracker configuration
//!
//! Plain JSON (camelCase keys); every field has a default, so `{}` is a
//! valid configuration.

use crate::capture::input::element::{DEFAULT_IDENTIFIER_TEXT_LIMIT, DEFAULT_SELECTOR_MAX_DEPTH};
use crate::capture::scroll::DEFAULT_MILESTONES;
use crate::capture::time::DEFAULT_RECORD_INTERVAL_SECS;
use crate::dispatch::{PageContext, RetentionPolicy};
use crate::recorder::channel::{TrackerError, TrackerResult};
use crate::store::{PruneLimits, DEFAULT_STORAGE_KEY};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    pub debounce_ms: u64,
    pub batch_interval_ms: u64,
    pub api_endpoint: String,
    pub scroll_milestones: Vec<u32>,
    pub scroll_throttle_ms: u64,
    pub time_tick_ms: u64,
    pub time_record_interval_secs: u64,
    pub storage_key: String,
    pub prune: PruneLimits,
    pub selector_max_depth: usize,
    pub identifier_text_limit: usize,
    pub retention: RetentionPolicy,
    /// Seed milestone flags from persisted scroll records
    pub restore_milestones: bool,
    /// `Some(false)` refuses to start tracking at all
    pub consent_given: Option<bool>,
    pub start_disabled: bool,
    pub page_url: String,
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            batch_interval_ms: 5000,
            api_endpoint: "http://localhost:8080/api/track".to_string(),
            scroll_milestones: DEFAULT_MILESTONES.to_vec(),
            scroll_throttle_ms: 100,
            time_tick_ms: 1000,
            time_record_interval_secs: DEFAULT_RECORD_INTERVAL_SECS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            prune: PruneLimits::default(),
            selector_max_depth: DEFAULT_SELECTOR_MAX_DEPTH,
            identifier_text_limit: DEFAULT_IDENTIFIER_TEXT_LIMIT,
            retention: RetentionPolicy::default(),
            restore_milestones: false,
            consent_given: None,
            start_disabled: false,
            page_url: String::new(),
            user_agent: concat!("click-scroll-scribe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TrackerConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tracker config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse tracker config {}", path.display()))?;
        config
            .validated()
            .with_context(|| format!("Invalid tracker config {}", path.display()))
    }

    /// Check ranges and normalize milestones to ascending, de-duplicated order.
    pub fn validated(mut self) -> TrackerResult<Self> {
        let non_zero = [
            ("batchIntervalMs", self.batch_interval_ms),
            ("scrollThrottleMs", self.scroll_throttle_ms),
            ("timeTickMs", self.time_tick_ms),
            ("timeRecordIntervalSecs", self.time_record_interval_secs),
        ];
        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(TrackerError::ConfigurationError(format!("{} must be greater than zero", name)));
        }

        if let Some(bad) = self.scroll_milestones.iter().find(|m| **m == 0 || **m > 100) {
            return Err(TrackerError::ConfigurationError(format!(
                "scroll milestone {} is outside 1..=100",
                bad
            )));
        }
        self.scroll_milestones.sort_unstable();
        self.scroll_milestones.dedup();

        if self.storage_key.is_empty() {
            return Err(TrackerError::ConfigurationError("storageKey must not be empty".to_string()));
        }

        reqwest::Url::parse(&self.api_endpoint).map_err(|e| {
            TrackerError::ConfigurationError(format!("apiEndpoint {}: {}", self.api_endpoint, e))
        })?;

        Ok(self)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }

    pub fn time_tick(&self) -> Duration {
        Duration::from_millis(self.time_tick_ms)
    }

    pub fn page_context(&self) -> PageContext {
        PageContext {
            page_url: self.page_url.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        let config: TrackerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(200));
        assert_eq!(config.batch_interval(), Duration::from_millis(5000));
        assert_eq!(config.storage_key, "trackingData");
    }

    #[test]
    fn test_validation_normalizes_milestones() {
        let config = TrackerConfig {
            scroll_milestones: vec![100, 25, 50, 25],
            ..TrackerConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.scroll_milestones, vec![25, 50, 100]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_interval = TrackerConfig {
            batch_interval_ms: 0,
            ..TrackerConfig::default()
        };
        assert!(zero_interval.validated().is_err());

        let bad_milestone = TrackerConfig {
            scroll_milestones: vec![25, 150],
            ..TrackerConfig::default()
        };
        assert!(bad_milestone.validated().is_err());

        let relative = TrackerConfig {
            api_endpoint: "/api/track".to_string(),
            ..TrackerConfig::default()
        };
        assert!(matches!(
            relative.validated(),
            Err(TrackerError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        std::fs::write(
            &path,
            r#"{"debounceMs": 350, "retention": "drainDelivered", "prune": {"clicks": 40}, "consentGiven": true}"#,
        )
        .unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.debounce_ms, 350);
        assert_eq!(config.retention, RetentionPolicy::DrainDelivered);
        assert_eq!(config.prune.clicks, 40);
        assert_eq!(config.prune.time_on_page, 10);
        assert_eq!(config.consent_given, Some(true));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();

        let err = TrackerConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }
}
