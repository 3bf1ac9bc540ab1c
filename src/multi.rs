// =============================================================================
// MultiIntervalSeries - one instrument across the daily and hourly intervals
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::bar::Interval;
use crate::series::Series;
use crate::store::{Provider, Store};

/// A daily and an hourly [`Series`] for the same instrument, driven together.
///
/// The daily series is the canonical one: current price reads from it, and
/// batch operations run daily first. Updates pause for the configured
/// throttle between intervals so a shared upstream is not hit back to back.
pub struct MultiIntervalSeries {
    instrument: String,
    daily: Series,
    hourly: Series,
}

impl MultiIntervalSeries {
    pub async fn open(
        store: Arc<dyn Store>,
        instrument: impl Into<String>,
        factor: f64,
        risk_free_rate: f64,
    ) -> Result<Self> {
        let instrument = instrument.into();
        let daily = Series::open(
            store.clone(),
            instrument.clone(),
            Interval::Daily,
            factor,
            risk_free_rate,
        )
        .await?;
        let hourly = Series::open(
            store,
            instrument.clone(),
            Interval::Hourly,
            factor,
            risk_free_rate,
        )
        .await?;
        Ok(Self {
            instrument,
            daily,
            hourly,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn daily(&self) -> &Series {
        &self.daily
    }

    pub fn daily_mut(&mut self) -> &mut Series {
        &mut self.daily
    }

    pub fn hourly(&self) -> &Series {
        &self.hourly
    }

    pub fn hourly_mut(&mut self) -> &mut Series {
        &mut self.hourly
    }

    pub fn get(&self, interval: Interval) -> &Series {
        match interval {
            Interval::Daily => &self.daily,
            Interval::Hourly => &self.hourly,
        }
    }

    pub fn get_mut(&mut self, interval: Interval) -> &mut Series {
        match interval {
            Interval::Daily => &mut self.daily,
            Interval::Hourly => &mut self.hourly,
        }
    }

    /// Close of the last known daily bar.
    pub fn current_price(&self) -> Option<f64> {
        self.daily.current_price()
    }

    /// Compute the static metric set on both intervals.
    pub async fn compute_static(&mut self, use_buffer: bool) -> Result<()> {
        self.daily.compute_static(use_buffer).await?;
        self.hourly.compute_static(use_buffer).await
    }

    /// Incrementally fetch both intervals, daily first, sleeping `throttle`
    /// in between.
    #[instrument(skip_all, fields(instrument = %self.instrument))]
    pub async fn update(
        &mut self,
        provider: &dyn Provider,
        from: Option<DateTime<Utc>>,
        throttle: std::time::Duration,
        max_stored_bars: usize,
    ) -> Result<()> {
        self.daily
            .update(provider, from, max_stored_bars)
            .await
            .with_context(|| format!("daily update failed for {}", self.instrument))?;
        sleep(throttle).await;
        self.hourly
            .update(provider, from, max_stored_bars)
            .await
            .with_context(|| format!("hourly update failed for {}", self.instrument))?;
        info!("both intervals updated");
        Ok(())
    }

    /// Delete persisted data for both intervals.
    pub async fn drop_data(&mut self) -> Result<()> {
        self.daily.drop_data().await?;
        self.hourly.drop_data().await
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
    use async_trait::async_trait;
    use chrono::Duration;
    use parking_lot::Mutex;

    /// Provider emitting one flat bar per day or hour, recording the interval
    /// order it was called in.
    struct FlatProvider {
        order: Mutex<Vec<Interval>>,
    }

    #[async_trait]
    impl Provider for FlatProvider {
        async fn fetch_bars(
            &self,
            key: &SeriesKey,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Bar>> {
            self.order.lock().push(key.interval);
            let step = key.interval.step();
            let mut bars = Vec::new();
            let mut t = from;
            while t <= to {
                bars.push(Bar::new(10.0, 10.0, 10.0, 10.0, 1.0, t));
                t += step;
            }
            Ok(bars)
        }
    }

    #[tokio::test]
    async fn update_runs_daily_then_hourly() {
        let store = Arc::new(MemoryStore::new());
        let mut multi = MultiIntervalSeries::open(store, "X", 1.0, 0.05)
            .await
            .unwrap();
        let provider = FlatProvider {
            order: Mutex::new(Vec::new()),
        };

        let from = Utc::now() - Duration::days(3);
        multi
            .update(&provider, Some(from), std::time::Duration::ZERO, 0)
            .await
            .unwrap();

        let order = provider.order.lock();
        assert!(!order.is_empty());
        let first_hourly = order.iter().position(|i| *i == Interval::Hourly);
        let last_daily = order.iter().rposition(|i| *i == Interval::Daily);
        assert!(last_daily < first_hourly);
        assert_eq!(multi.current_price(), Some(10.0));
    }

    #[tokio::test]
    async fn drop_data_clears_both_intervals() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for interval in [Interval::Daily, Interval::Hourly] {
            store
                .insert_bars(
                    &SeriesKey::new("X", interval),
                    &[Bar::new(1.0, 1.0, 1.0, 1.0, 1.0, now)],
                )
                .await
                .unwrap();
        }

        let mut multi = MultiIntervalSeries::open(store, "X", 1.0, 0.05)
            .await
            .unwrap();
        assert!(multi.current_price().is_some());

        multi.drop_data().await.unwrap();
        assert_eq!(multi.current_price(), None);
        assert_eq!(multi.hourly().current_price(), None);
    }
}
