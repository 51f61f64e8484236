use crate::domain::chart::HorizontalLayout;
use crate::domain::errors::ConfigurationError;
use crate::domain::logging::LogLevel;
use crate::domain::market_data::{RangeCalculator, ScaleTier};
use serde::{Deserialize, Serialize};

/// Engine configuration. Every key is optional in JSON; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub tier_thresholds: Vec<ScaleTier>,
    pub smoothing_rate: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub stale_after_ms: u64,
    pub max_render_hz: u32,
    pub out_of_order_tolerance_ms: u64,
    pub unsubscribe_grace_ms: u64,
    pub idle_evict_after_ms: u64,
    pub layout: HorizontalLayout,
    pub log_level: LogLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tier_thresholds: vec![
                ScaleTier::new(0.0, 0.3),
                ScaleTier::new(0.3, 0.5),
                ScaleTier::new(0.5, 0.75),
                ScaleTier::new(0.75, 1.0),
            ],
            smoothing_rate: 0.1,
            min_scale: 0.3,
            max_scale: 1.5,
            stale_after_ms: 5_000,
            max_render_hz: 60,
            out_of_order_tolerance_ms: 1_000,
            unsubscribe_grace_ms: 2_000,
            idle_evict_after_ms: 60_000,
            layout: HorizontalLayout::default(),
            log_level: LogLevel::Info,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        serde_json::to_string(self).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.range_calculator()?;
        if self.max_render_hz == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "maxRenderHz must be positive".to_string(),
            ));
        }
        if self.stale_after_ms == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "staleAfterMs must be positive".to_string(),
            ));
        }
        let fractions =
            [("axisPosition", self.layout.axis_position), ("floatWidth", self.layout.float_width)];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidParameter(format!(
                    "layout.{name} must be a fraction in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn range_calculator(&self) -> Result<RangeCalculator, ConfigurationError> {
        RangeCalculator::new(
            self.tier_thresholds.clone(),
            self.smoothing_rate,
            self.min_scale,
            self.max_scale,
        )
    }

    /// Minimum spacing between two frames of one display.
    pub fn min_frame_interval_ms(&self) -> u64 {
        let hz = u64::from(self.max_render_hz.max(1));
        1_000u64.div_ceil(hz)
    }
}
