//! Heatmap points from recorded clicks
//!
//! The renderer itself is external; it only needs `{x, y, value}` points and
//! a `{max, data}` reset.

use crate::capture::input::types::ClickRecord;
use crate::store::TrackingBundle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: f64,
    pub y: f64,
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub max: u32,
    pub data: Vec<HeatmapPoint>,
}

impl HeatmapData {
    /// The payload that resets a renderer to nothing.
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Wrap points, with `max` the highest click count on a single pixel.
    pub fn from_points(data: Vec<HeatmapPoint>) -> Self {
        let mut density: HashMap<(i64, i64), u32> = HashMap::new();
        for point in &data {
            *density
                .entry((point.x.round() as i64, point.y.round() as i64))
                .or_default() += point.value;
        }
        Self {
            max: density.values().copied().max().unwrap_or(0),
            data,
        }
    }
}

/// Which coordinates of a click become the point position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointSpace {
    /// Raw viewport coordinates (`x`, `y`)
    Viewport,
    /// Document coordinates (`pageX`, `pageY`)
    Page,
    /// Percentage coordinates scaled onto a surface of the given size
    Scaled { width: f64, height: f64 },
}

/// One unit-value point per click.
///
/// In `Scaled` space, clicks without percentage coordinates are skipped.
pub fn points_from_clicks(clicks: &[ClickRecord], space: PointSpace) -> Vec<HeatmapPoint> {
    clicks
        .iter()
        .filter_map(|click| {
            let (x, y) = match space {
                PointSpace::Viewport => (click.x, click.y),
                PointSpace::Page => (click.page_x, click.page_y),
                PointSpace::Scaled { width, height } => (
                    click.x_percent? / 100.0 * width,
                    click.y_percent? / 100.0 * height,
                ),
            };
            Some(HeatmapPoint { x, y, value: 1 })
        })
        .collect()
}

pub trait HeatmapRenderer {
    fn add_data(&mut self, points: &[HeatmapPoint]);

    fn set_data(&mut self, data: HeatmapData);
}

/// Push every stored click into the renderer. Returns the number of points.
pub fn load_existing_clicks<R: HeatmapRenderer + ?Sized>(
    renderer: &mut R,
    bundle: &TrackingBundle,
    space: PointSpace,
) -> usize {
    let points = points_from_clicks(&bundle.clicks, space);
    if !points.is_empty() {
        renderer.add_data(&points);
    }
    points.len()
}

pub fn clear_heatmap<R: HeatmapRenderer + ?Sized>(renderer: &mut R) {
    renderer.set_data(HeatmapData::cleared());
}
