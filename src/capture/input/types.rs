use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used wherever an element cannot be described.
pub const UNKNOWN_ELEMENT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub tag: String,
    pub identifier: String,
    pub full_selector: String,
}

/// Element information attached to a click.
///
/// Serializes either as a descriptor object or as the bare `"unknown"` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementInfo {
    Element(ElementDescriptor),
    Placeholder(String),
}

impl ElementInfo {
    pub fn unknown() -> Self {
        ElementInfo::Placeholder(UNKNOWN_ELEMENT.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ElementInfo::Placeholder(_))
    }

    pub fn descriptor(&self) -> Option<&ElementDescriptor> {
        match self {
            ElementInfo::Element(descriptor) => Some(descriptor),
            ElementInfo::Placeholder(_) => None,
        }
    }
}

impl Default for ElementInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickSource {
    Iframe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    /// Viewport X
    #[serde(default)]
    pub x: f64,
    /// Viewport Y
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_percent: Option<f64>,
    #[serde(default)]
    pub page_x: f64,
    #[serde(default)]
    pub page_y: f64,
    #[serde(default)]
    pub element: ElementInfo,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ClickSource>,
}

impl ClickRecord {
    /// Replace non-finite coordinates, which JSON cannot represent.
    ///
    /// Coordinates become 0 and percentages are dropped, so the stored bundle
    /// always reads back.
    pub fn with_finite_geometry(mut self) -> Self {
        self.x = finite_or_zero(self.x);
        self.y = finite_or_zero(self.y);
        self.page_x = finite_or_zero(self.page_x);
        self.page_y = finite_or_zero(self.page_y);
        self.x_percent = self.x_percent.filter(|p| p.is_finite());
        self.y_percent = self.y_percent.filter(|p| p.is_finite());
        self
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollRecord {
    pub percentage: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRecord {
    pub seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_visit: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl TimeRecord {
    pub fn is_final(&self) -> bool {
        self.final_visit.unwrap_or(false)
    }
}
