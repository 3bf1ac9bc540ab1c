// =============================================================================
// IsolatedWindowGenerator - fixed-size walk-forward windows, one at a time
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::bar::Interval;
use crate::series::Series;
use crate::store::Store;

/// Steps a fixed-size trailing window across one instrument's history.
///
/// Each step yields a [`Series`] holding exactly `window_size` consecutive
/// bars ending one bar later than the previous step. The series' caches are
/// reset before every step, so analytics computed on one window can never
/// leak into the next. The yielded borrow is only valid until the next
/// `advance`.
pub struct IsolatedWindowGenerator {
    bars: Vec<crate::bar::Bar>,
    series: Series,
    window_size: usize,
    // Index of the last bar of the next window to yield.
    cursor: usize,
}

impl IsolatedWindowGenerator {
    /// Load `[start, stop]` (stop defaults to now) for the instrument and
    /// position the first window at its beginning.
    ///
    /// Fails when `window_size` is zero or the loaded history is shorter
    /// than one window.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        store: Arc<dyn Store>,
        instrument: impl Into<String>,
        interval: Interval,
        start: DateTime<Utc>,
        stop: Option<DateTime<Utc>>,
        window_size: usize,
        factor: f64,
        risk_free_rate: f64,
    ) -> Result<Self> {
        if window_size == 0 {
            bail!("window size must be positive");
        }

        let mut series = Series::detached(store, instrument, interval, factor, risk_free_rate);
        series
            .buffer_mut()
            .load(Some(start), Some(stop.unwrap_or_else(Utc::now)))
            .await?;
        let bars = series.bars().to_vec();
        series.buffer_mut().clear();

        if bars.len() < window_size {
            bail!(
                "history too short: {} bars loaded, window needs {}",
                bars.len(),
                window_size
            );
        }
        info!(
            instrument = series.instrument(),
            bars = bars.len(),
            window_size,
            "window generator ready"
        );

        Ok(Self {
            bars,
            series,
            window_size,
            cursor: window_size - 1,
        })
    }

    /// Yield the next window, or `None` when the history is exhausted.
    pub async fn advance(&mut self) -> Option<&mut Series> {
        if self.cursor >= self.bars.len() {
            return None;
        }
        let from = self.cursor + 1 - self.window_size;
        // install_bars resets both caches before the new window lands.
        self.series
            .install_bars(self.bars[from..=self.cursor].to_vec());
        self.cursor += 1;
        Some(&mut self.series)
    }

    /// Windows not yet yielded.
    pub fn remaining(&self) -> usize {
        self.bars.len() - self.cursor.min(self.bars.len())
    }

    /// Total number of windows the history supports.
    pub fn steps(&self) -> usize {
        self.bars.len() + 1 - self.window_size
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::{Bar, SeriesKey};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    async fn seeded(n: i64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let bars: Vec<Bar> = (0..n)
            .map(|d| {
                let close = 100.0 + d as f64;
                Bar::new(close, close + 1.0, close - 1.0, close, 10.0, day(d))
            })
            .collect();
        store
            .insert_bars(&SeriesKey::new("X", Interval::Daily), &bars)
            .await
            .unwrap();
        store
    }

    async fn generator(store: Arc<MemoryStore>, window: usize) -> Result<IsolatedWindowGenerator> {
        IsolatedWindowGenerator::new(
            store,
            "X",
            Interval::Daily,
            day(0),
            Some(day(365)),
            window,
            1.0,
            0.05,
        )
        .await
    }

    #[tokio::test]
    async fn every_window_has_exact_size_and_slides_by_one() {
        let store = seeded(10).await;
        let mut windows = generator(store, 4).await.unwrap();
        assert_eq!(windows.steps(), 7);

        let mut expected_last = day(3);
        let mut count = 0;
        while let Some(series) = windows.advance().await {
            assert_eq!(series.bars().len(), 4);
            assert_eq!(series.bars().last().unwrap().time, expected_last);
            expected_last += Duration::days(1);
            count += 1;
        }
        assert_eq!(count, 7);
        assert_eq!(windows.remaining(), 0);
    }

    #[tokio::test]
    async fn caches_are_isolated_between_windows() {
        let store = seeded(6).await;
        let mut windows = generator(store, 3).await.unwrap();

        let series = windows.advance().await.unwrap();
        series.sma(2);
        series.volatility();
        assert_eq!(series.cached_indicator_count(), 1);

        let series = windows.advance().await.unwrap();
        assert_eq!(series.cached_indicator_count(), 0);
    }

    #[tokio::test]
    async fn window_analytics_see_only_window_bars() {
        let store = seeded(8).await;
        let mut windows = generator(store, 3).await.unwrap();

        // First window holds closes 100, 101, 102.
        let series = windows.advance().await.unwrap();
        let sma = series.sma(3);
        assert!((sma[2].unwrap() - 101.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn zero_window_rejected() {
        let store = seeded(5).await;
        assert!(generator(store, 0).await.is_err());
    }

    #[tokio::test]
    async fn short_history_rejected() {
        let store = seeded(3).await;
        assert!(generator(store, 4).await.is_err());
    }
}
