use super::value_objects::{CanvasGeometry, HorizontalLayout, VisualRange};
use serde::Serialize;

/// Domain service - price to pixel mapping for one display.
///
/// A pure function of the current visual range and the current geometry:
/// nothing from a previous mapping is carried over, so re-creating it after a
/// resize puts the same price at the same relative height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateMapper {
    visual: VisualRange,
    geometry: CanvasGeometry,
}

impl CoordinateMapper {
    pub fn new(visual: VisualRange, geometry: CanvasGeometry) -> Self {
        Self { visual, geometry }
    }

    pub fn visual_range(&self) -> VisualRange {
        self.visual
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    /// True when every price collapses onto a single point.
    pub fn is_degenerate(&self) -> bool {
        !usable_extent(self.geometry.height) || !(self.visual.span() > 0.0 && self.visual.span().is_finite())
    }

    /// Convert a price to a screen Y coordinate, clamped to `[0, height]`.
    pub fn y_for_price(&self, price: f64) -> f64 {
        let height = self.geometry.height;
        if !usable_extent(height) {
            return 0.0;
        }
        let span = self.visual.span();
        if !(span > 0.0 && span.is_finite()) || !price.is_finite() {
            return height / 2.0;
        }
        let y = height * (self.visual.high - price) / span;
        y.clamp(0.0, height)
    }

    /// Convert a screen Y coordinate back to price (for hit-testing).
    pub fn price_for_y(&self, y: f64) -> f64 {
        let height = self.geometry.height;
        if !usable_extent(height) || !y.is_finite() {
            return self.visual.low + self.visual.span() / 2.0;
        }
        let normalized = y.clamp(0.0, height) / height;
        self.visual.high - self.visual.span() * normalized
    }

    /// Linear position across the width; independent of price scaling.
    pub fn x_for_fraction(&self, fraction: f64) -> f64 {
        let width = self.geometry.width;
        if !usable_extent(width) || !fraction.is_finite() {
            return 0.0;
        }
        (width * fraction).clamp(0.0, width)
    }

    pub fn axis_x(&self, layout: &HorizontalLayout) -> f64 {
        self.x_for_fraction(layout.axis_position)
    }

    pub fn float_width(&self, layout: &HorizontalLayout) -> f64 {
        self.x_for_fraction(layout.float_width)
    }
}

fn usable_extent(extent: f64) -> bool {
    extent.is_finite() && extent > 0.0
}
