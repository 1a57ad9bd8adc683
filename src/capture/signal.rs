//! Abstract browser signals
//!
//! Capturers never touch a real DOM. A host (a wasm shim, a replay tool, a
//! test) turns browser events into `Signal`s and feeds them through a
//! `SignalSource`; every capture decision is made on these values.

use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::mpsc;

/// Snapshot of one element on the path from a click target to the document root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementNode {
    pub tag_name: String,
    pub id: Option<String>,
    pub class_list: Vec<String>,
    pub text_content: Option<String>,
}

impl ElementNode {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_list = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// The document body terminates selector paths.
    pub fn is_root_container(&self) -> bool {
        self.tag_name.eq_ignore_ascii_case("body")
    }
}

/// A pointer click as seen by the page.
#[derive(Debug, Clone)]
pub struct ClickSignal {
    /// When the click was observed; drives debouncing.
    pub at: Instant,
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Full scrollable height of the document; 0 when unknown.
    pub document_height: f64,
    /// Target element first, then its ancestors. Empty when the target is
    /// missing or is not an element.
    pub path: Vec<ElementNode>,
}

/// Scroll geometry at the time a scroll signal fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollGeometry {
    pub scroll_top: f64,
    pub document_height: f64,
    pub viewport_height: f64,
}

impl ScrollGeometry {
    /// Whole scroll percentage, 0 when the document cannot scroll.
    pub fn percentage(&self) -> u32 {
        let track_length = self.document_height - self.viewport_height;
        if track_length <= 0.0 || !self.scroll_top.is_finite() {
            return 0;
        }

        let percent = (self.scroll_top / track_length * 100.0).floor();
        if percent <= 0.0 {
            0
        } else {
            percent as u32
        }
    }
}

#[derive(Debug, Clone)]
pub enum Signal {
    Click(ClickSignal),
    Scroll(ScrollGeometry),
    /// Heartbeat of the time-on-page timer
    Tick { at: Instant },
    /// Structured message posted from an embedded frame
    Message(serde_json::Value),
    /// The page is being torn down
    Unload { at: Instant },
}

impl Signal {
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Click(_) => "click",
            Signal::Scroll(_) => "scroll",
            Signal::Tick { .. } => "tick",
            Signal::Message(_) => "message",
            Signal::Unload { .. } => "unload",
        }
    }
}

/// Where signals come from.
///
/// Implementations must be cancel-safe: the tracker polls `next_signal`
/// inside `tokio::select!` alongside its timers.
#[async_trait]
pub trait SignalSource: Send {
    /// Next signal, or `None` once the source is closed.
    async fn next_signal(&mut self) -> Option<Signal>;
}

#[async_trait]
impl SignalSource for mpsc::Receiver<Signal> {
    async fn next_signal(&mut self) -> Option<Signal> {
        self.recv().await
    }
}

#[async_trait]
impl SignalSource for mpsc::UnboundedReceiver<Signal> {
    async fn next_signal(&mut self) -> Option<Signal> {
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_percentage() {
        let geometry = ScrollGeometry {
            scroll_top: 500.0,
            document_height: 3000.0,
            viewport_height: 1000.0,
        };
        assert_eq!(geometry.percentage(), 25);

        let bottom = ScrollGeometry {
            scroll_top: 2000.0,
            ..geometry
        };
        assert_eq!(bottom.percentage(), 100);
    }

    #[test]
    fn test_scroll_percentage_floors() {
        let geometry = ScrollGeometry {
            scroll_top: 499.0,
            document_height: 3000.0,
            viewport_height: 1000.0,
        };
        assert_eq!(geometry.percentage(), 24);
    }

    #[test]
    fn test_unscrollable_document_is_zero() {
        let geometry = ScrollGeometry {
            scroll_top: 200.0,
            document_height: 800.0,
            viewport_height: 1000.0,
        };
        assert_eq!(geometry.percentage(), 0);

        let negative = ScrollGeometry {
            scroll_top: -40.0,
            document_height: 3000.0,
            viewport_height: 1000.0,
        };
        assert_eq!(negative.percentage(), 0);
    }

    #[tokio::test]
    async fn test_channel_source_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Signal::Message(serde_json::json!({"type": "noop"})))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(rx.next_signal().await.map(|s| s.kind()), Some("message"));
        assert!(rx.next_signal().await.is_none());
    }
}
