// =============================================================================
// SeriesBuffer - the in-memory bar window for one (instrument, interval)
// =============================================================================
//
// Holds a time-ascending window of scaled bars backed by a persistent store,
// plus the last known bar, which is maintained independently of the window:
// it survives `clear()` and is the cheapest way to read a current price
// without loading history.
//
// The price `factor` is fixed at construction and applied to every bar that
// enters the buffer (O/H/L/C only, never volume).
// =============================================================================

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::bar::{Bar, Interval, SeriesKey};
use crate::store::{incremental_fetch, Provider, Store};

pub struct SeriesBuffer {
    store: Arc<dyn Store>,
    key: SeriesKey,
    factor: f64,
    bars: Vec<Bar>,
    last_known: Option<Bar>,
}

impl SeriesBuffer {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a buffer and immediately read the last known bar from the store.
    pub async fn open(
        store: Arc<dyn Store>,
        instrument: impl Into<String>,
        interval: Interval,
        factor: f64,
    ) -> Result<Self> {
        let mut buffer = Self::detached(store, instrument, interval, factor);
        buffer.refresh_last_known().await?;
        Ok(buffer)
    }

    /// Create a buffer without touching the store. Used by the synchronizer
    /// and window generator for isolated instances whose bars are installed
    /// directly.
    pub fn detached(
        store: Arc<dyn Store>,
        instrument: impl Into<String>,
        interval: Interval,
        factor: f64,
    ) -> Self {
        Self {
            store,
            key: SeriesKey::new(instrument, interval),
            factor,
            bars: Vec::new(),
            last_known: None,
        }
    }

    // -------------------------------------------------------------------------
    // Store-backed operations
    // -------------------------------------------------------------------------

    /// Replace the window with the store's range query result.
    ///
    /// When either bound is absent, both default to the interval-specific
    /// range `[now - default_load_days, now]`. A query against data that does
    /// not exist yet yields an empty window - a normal state, not a failure.
    pub async fn load(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let (from, to) = match (from, to) {
            (Some(f), Some(t)) => (f, t),
            _ => {
                let now = Utc::now();
                (
                    now - Duration::days(self.key.interval.default_load_days()),
                    now,
                )
            }
        };

        let mut bars: Vec<Bar> = self
            .store
            .range_query(&self.key, from, to)
            .await?
            .iter()
            .map(|b| b.scaled(self.factor))
            .collect();
        bars.sort_by_key(|b| b.time);

        debug!(key = %self.key, count = bars.len(), "buffer loaded");
        self.bars = bars;
        Ok(())
    }

    /// Re-read the single most recent bar from the store.
    pub async fn refresh_last_known(&mut self) -> Result<()> {
        self.last_known = self
            .store
            .last_bar(&self.key)
            .await?
            .map(|b| b.scaled(self.factor));
        Ok(())
    }

    /// The latest bar at or before `date`, scaled. Point-in-time price lookup.
    pub async fn bar_before(&self, date: DateTime<Utc>) -> Result<Option<Bar>> {
        Ok(self
            .store
            .bar_before(&self.key, date)
            .await?
            .map(|b| b.scaled(self.factor)))
    }

    /// Pull new bars from the provider into the store, then refresh the last
    /// known bar. See [`incremental_fetch`] for the chunking/resume contract.
    pub async fn update(
        &mut self,
        provider: &dyn Provider,
        from: Option<DateTime<Utc>>,
        max_stored_bars: usize,
    ) -> Result<()> {
        incremental_fetch(
            self.store.as_ref(),
            provider,
            &self.key,
            from,
            max_stored_bars,
        )
        .await?;
        self.refresh_last_known().await
    }

    /// Delete this buffer's persisted data, then refresh the last known bar
    /// (which now comes back empty).
    pub async fn drop_data(&mut self) -> Result<()> {
        self.store.drop_series(&self.key).await?;
        self.bars.clear();
        self.refresh_last_known().await
    }

    // -------------------------------------------------------------------------
    // In-memory operations
    // -------------------------------------------------------------------------

    /// Empty the window without touching the last known bar.
    pub fn clear(&mut self) {
        self.bars.clear();
    }

    /// Forcibly overwrite the window with already-scaled bars and point the
    /// last known bar at the new tail (`None` when empty). Used to install
    /// exactly the bars visible as of a point in time.
    pub fn install_bars(&mut self, bars: Vec<Bar>) {
        self.last_known = bars.last().copied();
        self.bars = bars;
    }

    /// Keep only the `max` most recent bars (no-op when `max == 0`), and
    /// re-point the last known bar at the remaining tail.
    pub fn keep_recent(&mut self, max: usize) {
        if max > 0 && self.bars.len() > max {
            self.bars.drain(..self.bars.len() - max);
        }
        self.last_known = self.bars.last().copied();
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Close of the last known bar, independent of the loaded window.
    pub fn current_price(&self) -> Option<f64> {
        self.last_known.map(|b| b.close)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_known(&self) -> Option<&Bar> {
        self.last_known.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn instrument(&self) -> &str {
        &self.key.instrument
    }

    pub fn interval(&self) -> Interval {
        self.key.interval
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}

impl std::fmt::Debug for SeriesBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesBuffer")
            .field("key", &self.key)
            .field("factor", &self.factor)
            .field("bars", &self.bars.len())
            .field("last_known", &self.last_known.map(|b| b.time))
            .finish()
    }
}
