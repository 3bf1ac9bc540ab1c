// =============================================================================
// Series - one instrument at one interval, with cached analytics
// =============================================================================
//
// A `Series` wraps a `SeriesBuffer` and layers two kinds of analytics on top:
//
//   - static  - scalar risk/return metrics (volatility, average return,
//               Sharpe, max drawdown, volume averages), each memoized in its
//               own `Option<f64>` slot;
//   - dynamic - full indicator sequences, memoized per parameterization in a
//               key -> sequence cache.
//
// Everything is computed over the bars currently in the buffer and never
// recomputed until the relevant cache is reset. Callers that mutate the
// buffer (install/load) must reset the caches themselves; the walk-forward
// drivers in `sync` and `window` do exactly that.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::bar::{Bar, Interval};
use crate::buffer::SeriesBuffer;
use crate::indicators::{
    atr, bollinger, ema, macd, momentum, roc, rsi, sma, stochastic, volume,
};
use crate::indicators::{
    bollinger::BollingerSeries, macd::MacdSeries, stochastic::StochasticSeries,
};
use crate::metrics;
use crate::store::{Provider, Store};

// Standard parameterizations computed by `compute_dynamic`.
const STANDARD_SMA_PERIODS: [usize; 3] = [20, 50, 200];
const STANDARD_EMA_PERIODS: [usize; 2] = [12, 26];
const STANDARD_RSI_PERIOD: usize = 14;
const STANDARD_ATR_PERIOD: usize = 14;
const STANDARD_MOMENTUM_PERIOD: usize = 10;
const STANDARD_MACD: (usize, usize, usize) = (12, 26, 9);

/// Identifies one indicator parameterization in the dynamic cache.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum IndicatorKey {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Atr { period: usize },
    Momentum { period: usize },
    Roc { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    VolumeRatio { window: usize },
    AtrRatio { atr_period: usize, window: usize },
    /// `std_dev_x100` is the band width multiplier scaled by 100 so the key
    /// stays hashable (2.0 standard deviations -> 200).
    Bollinger { period: usize, std_dev_x100: u32 },
    Stochastic { k_period: usize, d_period: usize },
}

impl std::fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sma { period } => write!(f, "sma_{period}"),
            Self::Ema { period } => write!(f, "ema_{period}"),
            Self::Rsi { period } => write!(f, "rsi_{period}"),
            Self::Atr { period } => write!(f, "atr_{period}"),
            Self::Momentum { period } => write!(f, "momentum_{period}"),
            Self::Roc { period } => write!(f, "roc_{period}"),
            Self::Macd { fast, slow, signal } => write!(f, "macd_{fast}_{slow}_{signal}"),
            Self::VolumeRatio { window } => write!(f, "volume_ratio_{window}"),
            Self::AtrRatio { atr_period, window } => {
                write!(f, "atr_ratio_{atr_period}_{window}")
            }
            Self::Bollinger { period, std_dev_x100 } => {
                let whole = std_dev_x100 / 100;
                match std_dev_x100 % 100 {
                    0 => write!(f, "bollinger_{period}_{whole}"),
                    frac if frac % 10 == 0 => {
                        write!(f, "bollinger_{period}_{whole}.{}", frac / 10)
                    }
                    frac => write!(f, "bollinger_{period}_{whole}.{frac:02}"),
                }
            }
            Self::Stochastic { k_period, d_period } => {
                write!(f, "stochastic_{k_period}_{d_period}")
            }
        }
    }
}

/// A cached indicator result. Most indicators produce one aligned sequence;
/// the composite ones carry their own struct, and `AtrRatio` is compacted.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorSeries {
    Aligned(Vec<Option<f64>>),
    Compact(Vec<f64>),
    Macd(MacdSeries),
    Bollinger(BollingerSeries),
    Stochastic(StochasticSeries),
}

// Returned by accessors when the cache holds an unexpected variant for a key.
// That cannot happen through the public API (each key maps to exactly one
// variant), so these stand in for an unreachable branch without panicking.
static EMPTY_MACD: MacdSeries = MacdSeries {
    macd: Vec::new(),
    signal: Vec::new(),
    histogram: Vec::new(),
};
static EMPTY_BOLLINGER: BollingerSeries = BollingerSeries {
    upper: Vec::new(),
    middle: Vec::new(),
    lower: Vec::new(),
    percent_b: Vec::new(),
};
static EMPTY_STOCHASTIC: StochasticSeries = StochasticSeries {
    k: Vec::new(),
    d: Vec::new(),
};

pub struct Series {
    buffer: SeriesBuffer,
    risk_free_rate: f64,

    // ---- static analytics, memoized individually ----
    volatility: Option<f64>,
    average_return: Option<f64>,
    sharpe_ratio: Option<f64>,
    max_drawdown: Option<f64>,
    average_volume: Option<f64>,
    average_price_volume: Option<f64>,

    // ---- dynamic analytics, memoized per parameterization ----
    cache: HashMap<IndicatorKey, IndicatorSeries>,
}

impl Series {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub async fn open(
        store: Arc<dyn Store>,
        instrument: impl Into<String>,
        interval: Interval,
        factor: f64,
        risk_free_rate: f64,
    ) -> Result<Self> {
        let buffer = SeriesBuffer::open(store, instrument, interval, factor).await?;
        Ok(Self::from_buffer(buffer, risk_free_rate))
    }

    /// Build a series around a buffer that has not touched the store.
    pub fn detached(
        store: Arc<dyn Store>,
        instrument: impl Into<String>,
        interval: Interval,
        factor: f64,
        risk_free_rate: f64,
    ) -> Self {
        let buffer = SeriesBuffer::detached(store, instrument, interval, factor);
        Self::from_buffer(buffer, risk_free_rate)
    }

    fn from_buffer(buffer: SeriesBuffer, risk_free_rate: f64) -> Self {
        Self {
            buffer,
            risk_free_rate,
            volatility: None,
            average_return: None,
            sharpe_ratio: None,
            max_drawdown: None,
            average_volume: None,
            average_price_volume: None,
            cache: HashMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Buffer passthrough
    // -------------------------------------------------------------------------

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut SeriesBuffer {
        &mut self.buffer
    }

    pub fn instrument(&self) -> &str {
        self.buffer.instrument()
    }

    pub fn interval(&self) -> Interval {
        self.buffer.interval()
    }

    pub fn current_price(&self) -> Option<f64> {
        self.buffer.current_price()
    }

    pub fn bars(&self) -> &[Bar] {
        self.buffer.bars()
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Replace the window and invalidate every analytic computed from it.
    pub fn install_bars(&mut self, bars: Vec<Bar>) {
        self.clear_static();
        self.reset_dynamic();
        self.buffer.install_bars(bars);
    }

    /// Pull new bars from the provider and invalidate the caches.
    pub async fn update(
        &mut self,
        provider: &dyn Provider,
        from: Option<DateTime<Utc>>,
        max_stored_bars: usize,
    ) -> Result<()> {
        self.buffer.update(provider, from, max_stored_bars).await?;
        self.clear_static();
        self.reset_dynamic();
        Ok(())
    }

    /// Latest bar at or before `date`, straight from the store.
    pub async fn bar_before(&self, date: DateTime<Utc>) -> Result<Option<Bar>> {
        self.buffer.bar_before(date).await
    }

    pub async fn drop_data(&mut self) -> Result<()> {
        self.buffer.drop_data().await?;
        self.clear_static();
        self.reset_dynamic();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cache control
    // -------------------------------------------------------------------------

    /// Forget every cached indicator sequence.
    pub fn reset_dynamic(&mut self) {
        self.cache.clear();
    }

    /// Forget every memoized scalar metric.
    pub fn clear_static(&mut self) {
        self.volatility = None;
        self.average_return = None;
        self.sharpe_ratio = None;
        self.max_drawdown = None;
        self.average_volume = None;
        self.average_price_volume = None;
    }

    /// Number of cached indicator sequences. Test hook.
    pub fn cached_indicator_count(&self) -> usize {
        self.cache.len()
    }

    // -------------------------------------------------------------------------
    // Static analytics
    // -------------------------------------------------------------------------

    pub fn volatility(&mut self) -> f64 {
        if self.volatility.is_none() {
            self.volatility = Some(metrics::volatility(
                &self.buffer.closes(),
                self.buffer.interval(),
            ));
        }
        self.volatility.unwrap_or(0.0)
    }

    pub fn average_return(&mut self) -> f64 {
        if self.average_return.is_none() {
            self.average_return = Some(metrics::average_return(
                &self.buffer.closes(),
                self.buffer.interval(),
            ));
        }
        self.average_return.unwrap_or(0.0)
    }

    /// Sharpe ratio against the configured risk-free rate. Forces volatility
    /// and average return to be computed first if they are not cached.
    pub fn sharpe_ratio(&mut self) -> f64 {
        if self.sharpe_ratio.is_none() {
            let avg = self.average_return();
            let vol = self.volatility();
            self.sharpe_ratio = Some(metrics::sharpe_ratio(avg, vol, self.risk_free_rate));
        }
        self.sharpe_ratio.unwrap_or(0.0)
    }

    pub fn max_drawdown(&mut self) -> f64 {
        if self.max_drawdown.is_none() {
            self.max_drawdown = Some(metrics::max_drawdown(&self.buffer.closes()));
        }
        self.max_drawdown.unwrap_or(0.0)
    }

    pub fn average_volume(&mut self) -> f64 {
        if self.average_volume.is_none() {
            self.average_volume = Some(metrics::average_volume(self.buffer.bars()));
        }
        self.average_volume.unwrap_or(0.0)
    }

    pub fn average_price_volume(&mut self) -> f64 {
        if self.average_price_volume.is_none() {
            self.average_price_volume =
                Some(metrics::average_price_volume(self.buffer.bars()));
        }
        self.average_price_volume.unwrap_or(0.0)
    }

    // -------------------------------------------------------------------------
    // Dynamic analytics (indicator cache)
    // -------------------------------------------------------------------------

    fn aligned(&mut self, key: IndicatorKey) -> &[Option<f64>] {
        if !self.cache.contains_key(&key) {
            let closes = self.buffer.closes();
            let bars = self.buffer.bars();
            let series = match &key {
                IndicatorKey::Sma { period } => sma::calculate_sma(&closes, *period),
                IndicatorKey::Ema { period } => ema::calculate_ema(&closes, *period),
                IndicatorKey::Rsi { period } => rsi::calculate_rsi(&closes, *period),
                IndicatorKey::Atr { period } => atr::calculate_atr(bars, *period),
                IndicatorKey::Momentum { period } => {
                    momentum::calculate_momentum(&closes, *period)
                }
                IndicatorKey::Roc { period } => roc::calculate_roc(&closes, *period),
                IndicatorKey::VolumeRatio { window } => {
                    volume::calculate_volume_ratio(bars, *window)
                }
                _ => Vec::new(),
            };
            debug!(key = %key, len = series.len(), "indicator computed");
            self.cache.insert(key.clone(), IndicatorSeries::Aligned(series));
        }
        match self.cache.get(&key) {
            Some(IndicatorSeries::Aligned(v)) => v,
            _ => &[],
        }
    }

    pub fn sma(&mut self, period: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::Sma { period })
    }

    pub fn ema(&mut self, period: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::Ema { period })
    }

    pub fn rsi(&mut self, period: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::Rsi { period })
    }

    pub fn atr(&mut self, period: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::Atr { period })
    }

    pub fn momentum(&mut self, period: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::Momentum { period })
    }

    pub fn roc(&mut self, period: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::Roc { period })
    }

    pub fn volume_ratio(&mut self, window: usize) -> &[Option<f64>] {
        self.aligned(IndicatorKey::VolumeRatio { window })
    }

    /// Compacted ATR-to-average ratio. Unlike the other indicators this is a
    /// dense sequence shorter than the window; see
    /// [`atr::calculate_atr_ratio`].
    pub fn atr_ratio(&mut self, atr_period: usize, window: usize) -> &[f64] {
        let key = IndicatorKey::AtrRatio { atr_period, window };
        if !self.cache.contains_key(&key) {
            let series = atr::calculate_atr_ratio(self.buffer.bars(), atr_period, window);
            debug!(key = %key, len = series.len(), "indicator computed");
            self.cache.insert(key.clone(), IndicatorSeries::Compact(series));
        }
        match self.cache.get(&key) {
            Some(IndicatorSeries::Compact(v)) => v,
            _ => &[],
        }
    }

    pub fn macd(&mut self, fast: usize, slow: usize, signal: usize) -> &MacdSeries {
        let key = IndicatorKey::Macd { fast, slow, signal };
        if !self.cache.contains_key(&key) {
            let series = macd::calculate_macd(&self.buffer.closes(), fast, slow, signal);
            debug!(key = %key, "indicator computed");
            self.cache.insert(key.clone(), IndicatorSeries::Macd(series));
        }
        match self.cache.get(&key) {
            Some(IndicatorSeries::Macd(v)) => v,
            _ => &EMPTY_MACD,
        }
    }

    pub fn bollinger(&mut self, period: usize, std_dev: f64) -> &BollingerSeries {
        let key = IndicatorKey::Bollinger {
            period,
            std_dev_x100: (std_dev * 100.0).round() as u32,
        };
        if !self.cache.contains_key(&key) {
            let series = bollinger::calculate_bollinger(&self.buffer.closes(), period, std_dev);
            debug!(key = %key, "indicator computed");
            self.cache.insert(key.clone(), IndicatorSeries::Bollinger(series));
        }
        match self.cache.get(&key) {
            Some(IndicatorSeries::Bollinger(v)) => v,
            _ => &EMPTY_BOLLINGER,
        }
    }

    pub fn stochastic(&mut self, k_period: usize, d_period: usize) -> &StochasticSeries {
        let key = IndicatorKey::Stochastic { k_period, d_period };
        if !self.cache.contains_key(&key) {
            let series = stochastic::calculate_stochastic(self.buffer.bars(), k_period, d_period);
            debug!(key = %key, "indicator computed");
            self.cache.insert(key.clone(), IndicatorSeries::Stochastic(series));
        }
        match self.cache.get(&key) {
            Some(IndicatorSeries::Stochastic(v)) => v,
            _ => &EMPTY_STOCHASTIC,
        }
    }

    // -------------------------------------------------------------------------
    // Batch computation
    // -------------------------------------------------------------------------

    /// Compute the full static set.
    ///
    /// With `use_buffer` the metrics run over whatever the buffer currently
    /// holds. Without it the default range is loaded first and the window is
    /// cleared again afterwards, leaving only the memoized scalars behind.
    pub async fn compute_static(&mut self, use_buffer: bool) -> Result<()> {
        if !use_buffer {
            self.buffer.load(None, None).await?;
        }
        self.clear_static();
        self.volatility();
        self.average_return();
        self.sharpe_ratio();
        self.max_drawdown();
        self.average_volume();
        self.average_price_volume();
        // ATR rides along with the static pass; the cached sequence survives
        // the buffer clear like the scalars do.
        self.atr(STANDARD_ATR_PERIOD);
        if !use_buffer {
            self.buffer.clear();
        }
        Ok(())
    }

    /// Compute the standard dynamic set: SMA 20/50/200, EMA 12/26, RSI 14,
    /// ATR 14, momentum 10 and MACD 12/26/9. Same `use_buffer` contract as
    /// [`compute_static`](Self::compute_static), except the cached sequences
    /// survive the buffer clear.
    pub async fn compute_dynamic(&mut self, use_buffer: bool) -> Result<()> {
        if !use_buffer {
            self.buffer.load(None, None).await?;
        }
        self.reset_dynamic();
        for period in STANDARD_SMA_PERIODS {
            self.sma(period);
        }
        for period in STANDARD_EMA_PERIODS {
            self.ema(period);
        }
        self.rsi(STANDARD_RSI_PERIOD);
        self.atr(STANDARD_ATR_PERIOD);
        self.momentum(STANDARD_MOMENTUM_PERIOD);
        let (fast, slow, signal) = STANDARD_MACD;
        self.macd(fast, slow, signal);
        if !use_buffer {
            self.buffer.clear();
        }
        Ok(())
    }
}

impl std::fmt::Debug for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Series")
            .field("buffer", &self.buffer)
            .field("cached_indicators", &self.cache.len())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::SeriesKey;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(d as i64)
    }

    fn bar(d: u32, close: f64) -> Bar {
        Bar::new(close, close + 1.0, close - 1.0, close, 100.0, day(d))
    }

    fn series_with(closes: &[f64]) -> Series {
        let store = Arc::new(MemoryStore::new());
        let mut series = Series::detached(store, "X", Interval::Daily, 1.0, 0.05);
        series.install_bars(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| bar(i as u32, c))
                .collect(),
        );
        series
    }

    #[test]
    fn indicator_results_are_cached() {
        let mut series = series_with(&[100.0, 102.0, 101.0, 105.0, 110.0]);
        assert_eq!(series.cached_indicator_count(), 0);

        series.sma(3);
        assert_eq!(series.cached_indicator_count(), 1);
        series.sma(3);
        assert_eq!(series.cached_indicator_count(), 1);
        series.sma(5);
        assert_eq!(series.cached_indicator_count(), 2);
    }

    #[test]
    fn install_bars_invalidates_caches() {
        let mut series = series_with(&[100.0, 102.0, 101.0, 105.0, 110.0]);
        series.sma(3);
        let vol = series.volatility();
        assert!(vol > 0.0);

        series.install_bars(vec![bar(0, 50.0), bar(1, 50.0)]);
        assert_eq!(series.cached_indicator_count(), 0);
        // Constant closes, so volatility recomputes to zero.
        assert!((series.volatility() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn sharpe_forces_its_inputs() {
        let mut series = series_with(&[100.0, 101.0, 103.0, 102.0, 104.0]);
        let sharpe = series.sharpe_ratio();
        // The memoized slots must now agree with a direct recomputation.
        let expected = metrics::sharpe_ratio(
            series.average_return(),
            series.volatility(),
            series.risk_free_rate(),
        );
        assert!((sharpe - expected).abs() < 1e-12);
    }

    #[test]
    fn sharpe_zero_when_volatility_zero() {
        let mut series = series_with(&[100.0, 100.0, 100.0]);
        assert!((series.sharpe_ratio() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn indicator_key_display() {
        assert_eq!(IndicatorKey::Sma { period: 20 }.to_string(), "sma_20");
        assert_eq!(
            IndicatorKey::Macd { fast: 12, slow: 26, signal: 9 }.to_string(),
            "macd_12_26_9"
        );
        assert_eq!(
            IndicatorKey::Bollinger { period: 20, std_dev_x100: 200 }.to_string(),
            "bollinger_20_2"
        );
        // Fractional widths must not collapse onto the whole-number key.
        assert_eq!(
            IndicatorKey::Bollinger { period: 20, std_dev_x100: 150 }.to_string(),
            "bollinger_20_1.5"
        );
        assert_eq!(
            IndicatorKey::Bollinger { period: 10, std_dev_x100: 225 }.to_string(),
            "bollinger_10_2.25"
        );
    }

    #[test]
    fn aligned_indicators_match_window_length() {
        let mut series = series_with(&[100.0, 102.0, 101.0]);
        assert_eq!(series.sma(20).len(), 3);
        assert_eq!(series.rsi(14).len(), 3);
        assert_eq!(series.macd(12, 26, 9).macd.len(), 3);
    }

    #[tokio::test]
    async fn compute_static_without_buffer_leaves_window_empty() {
        let store = Arc::new(MemoryStore::new());
        let key = SeriesKey::new("X", Interval::Daily);
        let now = Utc::now();
        let bars: Vec<Bar> = (0..10)
            .map(|i| {
                Bar::new(
                    100.0 + i as f64,
                    101.0 + i as f64,
                    99.0 + i as f64,
                    100.0 + i as f64,
                    50.0,
                    now - chrono::Duration::days(10 - i),
                )
            })
            .collect();
        store.insert_bars(&key, &bars).await.unwrap();

        let mut series = Series::open(store, "X", Interval::Daily, 1.0, 0.05)
            .await
            .unwrap();
        series.compute_static(false).await.unwrap();

        assert!(series.buffer().is_empty());
        assert!(series.volatility() > 0.0);
        assert!(series.max_drawdown().abs() < 1e-12);
    }

    #[tokio::test]
    async fn compute_dynamic_populates_standard_set() {
        let mut series = series_with(
            &(0..60).map(|i| 100.0 + (i as f64).sin()).collect::<Vec<_>>(),
        );
        series.compute_dynamic(true).await.unwrap();

        // 3 SMA + 2 EMA + RSI + ATR + momentum + MACD = 9 entries.
        assert_eq!(series.cached_indicator_count(), 9);
        assert!(series.sma(20).iter().any(|v| v.is_some()));
        assert!(series.macd(12, 26, 9).macd.iter().any(|v| v.is_some()));
    }
}
