// =============================================================================
// Core candle types - Bar, Interval, SeriesKey
// =============================================================================
//
// A `Bar` is one immutable OHLCV observation. Stores hold bars in their raw
// quotation; price scaling (`factor`) is applied when a bar enters a
// `SeriesBuffer`, and only to O/H/L/C - never to volume.
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV observation for a fixed time interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub time: DateTime<Utc>,
}

impl Bar {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            time,
        }
    }

    /// Return a copy with O/H/L/C multiplied by `factor`.
    ///
    /// Used to rebase bond prices to percent-of-nominal or to express prices
    /// in a common unit. Volume is intentionally left untouched.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            volume: self.volume,
            time: self.time,
        }
    }
}

/// Supported candle intervals.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Daily,
    Hourly,
}

impl Interval {
    /// Multiplier converting a per-bar statistic to an annualized one:
    /// 252 trading days, or ~2205 trading hours, per year.
    pub fn annualization_factor(&self) -> f64 {
        match self {
            Self::Daily => 252.0,
            Self::Hourly => 2205.0,
        }
    }

    /// Default look-back span for a buffer load when no range is given.
    pub fn default_load_days(&self) -> i64 {
        match self {
            Self::Daily => 5 * 365,
            Self::Hourly => 365,
        }
    }

    /// Deepest history an incremental fetch will reach back for.
    pub fn max_backfill_days(&self) -> i64 {
        match self {
            Self::Daily => 20 * 365,
            Self::Hourly => 3 * 365,
        }
    }

    /// Per-chunk span cap for incremental fetches. A backfill larger than
    /// this is paged, committing each chunk to the store before the next.
    pub fn max_step_days(&self) -> i64 {
        match self {
            Self::Daily => 5 * 365,
            Self::Hourly => 90,
        }
    }

    /// Nominal duration of one bar at this interval.
    pub fn step(&self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Hourly => Duration::hours(1),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "1d"),
            Self::Hourly => write!(f, "1h"),
        }
    }
}

/// Composite key that identifies a unique candle series in a store.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub instrument: String,
    pub interval: Interval,
}

impl SeriesKey {
    pub fn new(instrument: impl Into<String>, interval: Interval) -> Self {
        Self {
            instrument: instrument.into(),
            interval,
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.instrument, self.interval)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scaled_applies_factor_to_prices_only() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0, 1234.0, t);
        let scaled = bar.scaled(0.1);

        assert!((scaled.open - 10.0).abs() < 1e-10);
        assert!((scaled.high - 11.0).abs() < 1e-10);
        assert!((scaled.low - 9.0).abs() < 1e-10);
        assert!((scaled.close - 10.5).abs() < 1e-10);
        assert!((scaled.volume - 1234.0).abs() < 1e-10);
        assert_eq!(scaled.time, t);
    }

    #[test]
    fn annualization_factors() {
        assert!((Interval::Daily.annualization_factor() - 252.0).abs() < 1e-10);
        assert!((Interval::Hourly.annualization_factor() - 2205.0).abs() < 1e-10);
    }

    #[test]
    fn key_display() {
        let key = SeriesKey::new("BBG000PGXPS4", Interval::Daily);
        assert_eq!(key.to_string(), "BBG000PGXPS4@1d");
    }

    #[test]
    fn interval_serde_round_trip() {
        let json = serde_json::to_string(&Interval::Hourly).unwrap();
        let back: Interval = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Interval::Hourly);
    }
}
