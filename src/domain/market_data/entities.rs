pub use super::value_objects::{Price, SessionSeed, Symbol, Timestamp};
use crate::domain::chart::VisualRange;
use crate::domain::market_data::services::RangeCalculator;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Domain entity - a single timestamped price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: Timestamp,
}

impl Tick {
    pub fn new(symbol: Symbol, price: f64, timestamp: u64) -> Self {
        Self { symbol, price: Price::new(price), timestamp: Timestamp::from_millis(timestamp) }
    }
}

/// Why a tick was not applied. Expected traffic, so not an error type.
#[derive(Debug, Clone, PartialEq, Display, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TickRejection {
    #[display(fmt = "{}: invalid price {}", symbol, price)]
    InvalidPrice { symbol: String, price: f64 },
    #[display(fmt = "invalid symbol '{}'", symbol)]
    InvalidSymbol { symbol: String },
    #[display(fmt = "{}: no state cell", symbol)]
    UnknownSymbol { symbol: Symbol },
    #[display(fmt = "{}: session not seeded", symbol)]
    Unseeded { symbol: Symbol },
    #[display(fmt = "{}: tick at {} is older than {} beyond tolerance", symbol, timestamp, last_update_time)]
    #[serde(rename_all = "camelCase")]
    OutOfOrder { symbol: Symbol, timestamp: u64, last_update_time: u64 },
}

impl TickRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            TickRejection::InvalidPrice { .. } => "invalidPrice",
            TickRejection::InvalidSymbol { .. } => "invalidSymbol",
            TickRejection::UnknownSymbol { .. } => "unknownSymbol",
            TickRejection::Unseeded { .. } => "unseeded",
            TickRejection::OutOfOrder { .. } => "outOfOrder",
        }
    }
}

/// Domain entity - running statistics for one instrument.
///
/// Values of this type are immutable snapshots: every accepted tick or session
/// reset produces a new value and the previous one is left untouched for any
/// reader still holding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolState {
    pub symbol: Symbol,
    pub daily_open: Price,
    pub current_price: Price,
    pub session_high: Price,
    pub session_low: Price,
    pub projected_range: f64,
    pub visual_scale_factor: f64,
    /// Newest accepted tick time (tick clock).
    pub last_update_time: Timestamp,
    /// Local clock time the snapshot was produced at.
    pub received_at: Timestamp,
    pub session: u64,
    pub generation: u64,
}

impl SymbolState {
    /// Fresh session state with `current_price = daily_open`.
    ///
    /// Session and generation counters continue from `previous`, and so does
    /// `last_update_time`, so ticks older than the reset stay rejected.
    pub fn seeded(
        symbol: Symbol,
        seed: &SessionSeed,
        initial_scale: f64,
        previous: Option<&SymbolState>,
        received_at: Timestamp,
    ) -> Self {
        let (session, generation, last_update_time) = match previous {
            Some(prev) => (prev.session + 1, prev.generation + 1, prev.last_update_time),
            None => (1, 1, Timestamp::default()),
        };
        Self {
            symbol,
            daily_open: seed.daily_open,
            current_price: seed.daily_open,
            session_high: seed.daily_open,
            session_low: seed.daily_open,
            projected_range: seed.projected_range,
            visual_scale_factor: initial_scale,
            last_update_time,
            received_at,
            session,
            generation,
        }
    }

    /// Next snapshot after observing `price` at `timestamp`.
    ///
    /// A tick older than `last_update_time` only widens the extrema: the
    /// current price keeps tracking the newest observation.
    pub fn with_tick(
        &self,
        price: Price,
        timestamp: Timestamp,
        received_at: Timestamp,
        calculator: &RangeCalculator,
    ) -> Self {
        let mut next = self.clone();
        next.session_high = self.session_high.max(price);
        next.session_low = self.session_low.min(price);
        next.received_at = received_at;
        next.generation = self.generation + 1;

        if timestamp >= self.last_update_time {
            next.current_price = price;
            next.last_update_time = timestamp;
            next.visual_scale_factor = calculator.next_scale(
                self.visual_scale_factor,
                price.value(),
                self.daily_open.value(),
                self.projected_range,
            );
        }
        next
    }

    /// Same price at the same timestamp as the newest tick.
    pub fn is_duplicate(&self, price: Price, timestamp: Timestamp) -> bool {
        self.last_update_time == timestamp && self.current_price == price
    }

    /// Tick older than the newest one whose price the extrema already cover;
    /// applying it would change nothing.
    pub fn is_covered_late_tick(&self, price: Price, timestamp: Timestamp) -> bool {
        timestamp < self.last_update_time && self.session_low <= price && price <= self.session_high
    }

    /// Fraction of the projected range consumed by the current excursion.
    pub fn distance_fraction(&self) -> f64 {
        RangeCalculator::distance_fraction(
            self.current_price.value(),
            self.daily_open.value(),
            self.projected_range,
        )
    }

    pub fn visual_range(&self) -> VisualRange {
        VisualRange::around(self.daily_open.value(), self.projected_range, self.visual_scale_factor)
    }

    /// No snapshot produced for at least `window_ms` on the local clock.
    pub fn is_quiet_for(&self, now: u64, window_ms: u64) -> bool {
        self.received_at.elapsed_until(now) >= window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::services::ScaleTier;

    fn calculator() -> RangeCalculator {
        RangeCalculator::new(
            vec![
                ScaleTier::new(0.0, 0.3),
                ScaleTier::new(0.3, 0.5),
                ScaleTier::new(0.5, 0.75),
                ScaleTier::new(0.75, 1.0),
            ],
            0.1,
            0.3,
            1.5,
        )
        .expect("valid calculator")
    }

    fn ms(value: u64) -> Timestamp {
        Timestamp::from_millis(value)
    }

    fn seeded() -> SymbolState {
        let seed = SessionSeed::new(100.0, 10.0).expect("seed");
        SymbolState::seeded(Symbol::from("XAUUSD"), &seed, 0.3, None, ms(0))
    }

    #[test]
    fn extrema_widen_and_bracket_current() {
        let calc = calculator();
        let s = seeded()
            .with_tick(Price::new(103.0), ms(10), ms(10), &calc)
            .with_tick(Price::new(98.0), ms(20), ms(20), &calc)
            .with_tick(Price::new(101.0), ms(30), ms(30), &calc);
        assert_eq!(s.session_high.value(), 103.0);
        assert_eq!(s.session_low.value(), 98.0);
        assert_eq!(s.current_price.value(), 101.0);
        assert!(s.session_low <= s.current_price && s.current_price <= s.session_high);
        assert_eq!(s.generation, 4);
    }

    #[test]
    fn late_tick_only_widens_extrema() {
        let calc = calculator();
        let s = seeded().with_tick(Price::new(101.0), ms(50), ms(50), &calc);
        let scale = s.visual_scale_factor;
        let late = s.with_tick(Price::new(95.0), ms(40), ms(51), &calc);
        assert_eq!(late.current_price.value(), 101.0);
        assert_eq!(late.session_low.value(), 95.0);
        assert_eq!(late.last_update_time.value(), 50);
        assert_eq!(late.visual_scale_factor, scale);
    }

    #[test]
    fn covered_late_tick_is_detected() {
        let calc = calculator();
        let s = seeded()
            .with_tick(Price::new(104.0), ms(10), ms(10), &calc)
            .with_tick(Price::new(99.0), ms(20), ms(20), &calc);
        assert!(s.is_covered_late_tick(Price::new(104.0), ms(10)));
        assert!(!s.is_covered_late_tick(Price::new(98.0), ms(10)));
        assert!(!s.is_covered_late_tick(Price::new(101.0), ms(20)));
    }

    #[test]
    fn rejection_display_and_kind() {
        let symbol = Symbol::from("eurusd");
        let r = TickRejection::OutOfOrder { symbol, timestamp: 5, last_update_time: 9000 };
        assert_eq!(r.kind(), "outOfOrder");
        assert_eq!(r.to_string(), "EURUSD: tick at 5 is older than 9000 beyond tolerance");
    }

    #[test]
    fn reseed_continues_counters() {
        let calc = calculator();
        let s = seeded().with_tick(Price::new(104.0), ms(70), ms(70), &calc);
        let seed = SessionSeed::new(104.0, 8.0).expect("seed");
        let next = SymbolState::seeded(s.symbol.clone(), &seed, 0.3, Some(&s), ms(80));
        assert_eq!(next.session, 2);
        assert_eq!(next.generation, s.generation + 1);
        assert_eq!(next.last_update_time.value(), 70);
        assert_eq!(next.session_high, next.session_low);
        assert_eq!(next.current_price.value(), 104.0);
    }
}
