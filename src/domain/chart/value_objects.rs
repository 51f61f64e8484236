use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Value Object - identifier of one open display (canvas)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct DisplayId(String);

impl DisplayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DisplayId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Value Object - drawable content area of a display, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct CanvasGeometry {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self { width: 800.0, height: 600.0 }
    }
}

impl CanvasGeometry {
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// Value Object - price window currently mapped onto a display's height
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct VisualRange {
    pub low: f64,
    pub high: f64,
}

impl VisualRange {
    /// `center ± (projected_range / 2) × scale`
    pub fn around(center: f64, projected_range: f64, scale: f64) -> Self {
        let half = projected_range / 2.0 * scale;
        Self { low: center - half, high: center + half }
    }

    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

/// Value Object - horizontal placement of auxiliary elements, as fractions of width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HorizontalLayout {
    pub axis_position: f64,
    pub float_width: f64,
}

impl Default for HorizontalLayout {
    fn default() -> Self {
        Self { axis_position: 0.65, float_width: 0.1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_range_is_centered() {
        let range = VisualRange::around(1.05, 0.01, 1.0);
        assert!((range.low - 1.045).abs() < 1e-12);
        assert!((range.high - 1.055).abs() < 1e-12);
        assert!(range.contains(1.05));
        assert!(!range.contains(1.06));
    }

    #[test]
    fn degenerate_geometry_detected() {
        assert!(!CanvasGeometry::new(300.0, 200.0).is_degenerate());
        assert!(CanvasGeometry::new(0.0, 200.0).is_degenerate());
        assert!(CanvasGeometry::new(300.0, -1.0).is_degenerate());
        assert!(CanvasGeometry::new(300.0, f64::NAN).is_degenerate());
    }
}
