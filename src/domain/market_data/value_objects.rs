use crate::domain::errors::{DomainResult, ValidationError};
use derive_more::{Constructor, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Value Object - price of a single observation
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Tick prices must be finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    pub fn validated(value: f64) -> DomainResult<Self> {
        let price = Self(value);
        if price.is_valid() { Ok(price) } else { Err(ValidationError::InvalidPrice(value)) }
    }

    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 { other } else { self }
    }

    pub fn min(self, other: Self) -> Self {
        if other.0 < self.0 { other } else { self }
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - millisecond timestamp
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, From, Into, Deref, Constructor,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn from_millis(value: u64) -> Self {
        Self(value)
    }

    /// Milliseconds elapsed from `self` until `now`, zero if `now` is earlier.
    pub fn elapsed_until(&self, now: u64) -> u64 {
        now.saturating_sub(self.0)
    }
}

/// Value Object - trading symbol, normalised to upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: &str) -> DomainResult<Self> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidSymbol("Symbol cannot be empty".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidSymbol(format!("Symbol '{trimmed}' contains whitespace")));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }
}

/// Value Object - the baseline a trading session is drawn around
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSeed {
    pub daily_open: Price,
    pub projected_range: f64,
}

impl SessionSeed {
    pub fn new(daily_open: f64, projected_range: f64) -> DomainResult<Self> {
        let daily_open = Price::validated(daily_open)?;
        if !projected_range.is_finite() || projected_range <= 0.0 {
            return Err(ValidationError::InvalidProjectedRange(projected_range));
        }
        Ok(Self { daily_open, projected_range })
    }
}

/// Value Object - high/low of one completed session
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct SessionRange {
    pub high: f64,
    pub low: f64,
}

impl SessionRange {
    /// Spread of the session, `None` for malformed history rows.
    pub fn spread(&self) -> Option<f64> {
        let spread = self.high - self.low;
        (self.high.is_finite() && self.low.is_finite() && spread >= 0.0).then_some(spread)
    }
}
