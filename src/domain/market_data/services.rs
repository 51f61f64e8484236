use super::value_objects::SessionRange;
use crate::domain::errors::ConfigurationError;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// One step of the auto-scale table: at `fraction` of the projected range
/// consumed, the view eases toward `target_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTier {
    pub fraction: f64,
    pub target_scale: f64,
}

/// Domain service that tracks how much of the projected range a display shows.
///
/// The factor follows a target recomputed on every tick with exponential
/// smoothing and is clamped to `[min_scale, max_scale]`, so it shrinks again
/// when price retraces toward the daily open instead of ratcheting upward.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCalculator {
    tiers: Vec<ScaleTier>,
    smoothing_rate: f64,
    min_scale: f64,
    max_scale: f64,
}

impl RangeCalculator {
    pub fn new(
        tiers: Vec<ScaleTier>,
        smoothing_rate: f64,
        min_scale: f64,
        max_scale: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(smoothing_rate > 0.0 && smoothing_rate < 1.0) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "smoothingRate must be in (0, 1), got {smoothing_rate}"
            )));
        }
        if !(min_scale.is_finite() && max_scale.is_finite() && min_scale > 0.0 && min_scale <= max_scale) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "scale bounds must satisfy 0 < minScale <= maxScale, got [{min_scale}, {max_scale}]"
            )));
        }
        validate_tiers(&tiers)?;
        Ok(Self { tiers, smoothing_rate, min_scale, max_scale })
    }

    pub fn tiers(&self) -> &[ScaleTier] {
        &self.tiers
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    /// `|current - open| / projected`; zero when the projected range is unusable.
    pub fn distance_fraction(current_price: f64, daily_open: f64, projected_range: f64) -> f64 {
        if !projected_range.is_finite() || projected_range <= 0.0 {
            return 0.0;
        }
        let fraction = (current_price - daily_open).abs() / projected_range;
        if fraction.is_finite() { fraction } else { 0.0 }
    }

    /// Target of the last tier reached; `min_scale` below the first tier.
    pub fn target_scale(&self, distance_fraction: f64) -> f64 {
        self.tiers
            .iter()
            .rev()
            .find(|tier| distance_fraction >= tier.fraction)
            .map(|tier| tier.target_scale)
            .unwrap_or(self.min_scale)
    }

    /// Scale a session starts from: the target for price sitting on the open.
    pub fn initial_scale(&self) -> f64 {
        self.clamp(self.target_scale(0.0))
    }

    pub fn next_scale(
        &self,
        previous_scale: f64,
        current_price: f64,
        daily_open: f64,
        projected_range: f64,
    ) -> f64 {
        let previous = if previous_scale.is_finite() { previous_scale } else { self.initial_scale() };
        if !projected_range.is_finite() || projected_range <= 0.0 || !current_price.is_finite() {
            return self.clamp(previous);
        }
        let fraction = Self::distance_fraction(current_price, daily_open, projected_range);
        let target = self.target_scale(fraction);
        self.clamp(previous + self.smoothing_rate * (target - previous))
    }

    fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

fn validate_tiers(tiers: &[ScaleTier]) -> Result<(), ConfigurationError> {
    if tiers.is_empty() {
        return Err(ConfigurationError::InvalidParameter("tierThresholds must not be empty".to_string()));
    }
    for tier in tiers {
        if !tier.fraction.is_finite() || tier.fraction < 0.0 || !tier.target_scale.is_finite() {
            return Err(ConfigurationError::InvalidParameter(format!(
                "tier ({}, {}) must have a finite non-negative fraction and a finite target",
                tier.fraction, tier.target_scale
            )));
        }
    }
    for pair in tiers.windows(2) {
        if pair[1].fraction <= pair[0].fraction {
            return Err(ConfigurationError::InvalidParameter(
                "tierThresholds fractions must be strictly increasing".to_string(),
            ));
        }
        if pair[1].target_scale < pair[0].target_scale {
            return Err(ConfigurationError::InvalidParameter(
                "tierThresholds targets must be non-decreasing".to_string(),
            ));
        }
    }
    Ok(())
}

/// Rolling mean of the last `lookback` sessions' high-low spread.
///
/// Malformed sessions are skipped; `None` when nothing usable remains.
pub fn average_daily_range(history: &[SessionRange], lookback: usize) -> Option<f64> {
    let spreads: Vec<f64> = history
        .iter()
        .rev()
        .filter_map(SessionRange::spread)
        .filter(|spread| *spread > 0.0)
        .take(lookback)
        .collect();
    if spreads.is_empty() {
        return None;
    }
    Some(spreads.iter().sum::<f64>() / spreads.len() as f64)
}
