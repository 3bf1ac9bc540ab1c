// =============================================================================
// Store & Provider boundary - persistence and upstream market data
// =============================================================================
//
// The engine never fetches data itself. It talks to two collaborators:
//
//   - `Store`    - persistent candle storage with range / last-bar queries.
//                  "No data yet" is a normal empty result, never an error.
//   - `Provider` - upstream market-data source that supplies raw bars for a
//                  bounded time span per call.
//
// `incremental_fetch` is the chunked backfill loop that drives a Provider
// into a Store: it resumes from the last persisted bar, pages across spans
// larger than the provider's per-call maximum, and commits every chunk
// before fetching the next so a mid-backfill failure never loses progress.
// =============================================================================

pub mod memory;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::bar::{Bar, SeriesKey};

pub use memory::MemoryStore;

/// Persistent candle storage.
///
/// All read methods treat missing data as a normal state: a query against a
/// series that was never written returns an empty vec / `None`, not an error.
/// `Err` is reserved for genuine I/O failures, which propagate unchanged.
#[async_trait]
pub trait Store: Send + Sync {
    /// Bars with `from <= time <= to`, ascending by time. Empty if none.
    async fn range_query(
        &self,
        key: &SeriesKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;

    /// The single most recent bar for the series, if any.
    async fn last_bar(&self, key: &SeriesKey) -> Result<Option<Bar>>;

    /// The latest bar with `time <= date`, if any. Used by point-in-time
    /// price and currency lookups.
    async fn bar_before(&self, key: &SeriesKey, date: DateTime<Utc>) -> Result<Option<Bar>>;

    /// Upsert bars keyed by time (a re-written time replaces the old bar).
    async fn insert_bars(&self, key: &SeriesKey, bars: &[Bar]) -> Result<()>;

    /// Delete all persisted data for the series.
    async fn drop_series(&self, key: &SeriesKey) -> Result<()>;

    /// Delete the oldest bars beyond `keep`. `keep == 0` disables pruning.
    async fn prune(&self, key: &SeriesKey, keep: usize) -> Result<()>;
}

/// Upstream market-data source. One call covers one bounded span; paging
/// across larger spans is the responsibility of [`incremental_fetch`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Raw (unscaled) bars with `from <= time <= to`, ascending by time.
    async fn fetch_bars(
        &self,
        key: &SeriesKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;
}

/// Pull new bars from `provider` into `store` for one series.
///
/// Behavior:
/// - Resumes from the last persisted bar's time when the series already has
///   data (that bar is refetched so a partially formed bar gets replaced by
///   the upsert). Otherwise starts at `from`, or at the interval's maximum
///   backfill depth when `from` is absent.
/// - The start is clamped so the span never exceeds
///   [`Interval::max_backfill_days`](crate::bar::Interval::max_backfill_days).
/// - The span is paged in chunks of at most
///   [`Interval::max_step_days`](crate::bar::Interval::max_step_days); each
///   chunk is committed before the next is fetched, so a resumed fetch
///   continues from the last persisted bar rather than restarting.
/// - Afterwards the series is pruned to `max_stored_bars` (0 = unlimited).
///
/// Provider/store failures propagate unchanged; there are no retries here.
#[instrument(skip(store, provider), fields(key = %key))]
pub async fn incremental_fetch(
    store: &dyn Store,
    provider: &dyn Provider,
    key: &SeriesKey,
    from: Option<DateTime<Utc>>,
    max_stored_bars: usize,
) -> Result<()> {
    let to = Utc::now();

    // Resume point: last persisted bar wins over the caller-supplied start.
    let resume = store
        .last_bar(key)
        .await
        .context("failed to query last persisted bar")?
        .map(|bar| bar.time);

    let start = resume
        .or(from)
        .unwrap_or_else(|| to - Duration::days(key.interval.max_backfill_days()));

    // Never reach deeper than the interval's maximum backfill depth.
    let mut current_from = start.max(to - Duration::days(key.interval.max_backfill_days()));
    let max_step = Duration::days(key.interval.max_step_days());

    let mut total = 0usize;
    while current_from < to {
        let current_to = (current_from + max_step).min(to);

        let bars = provider
            .fetch_bars(key, current_from, current_to)
            .await
            .with_context(|| format!("provider fetch failed for {key}"))?;

        if !bars.is_empty() {
            total += bars.len();
            store
                .insert_bars(key, &bars)
                .await
                .with_context(|| format!("failed to commit chunk for {key}"))?;
        }
        debug!(
            from = %current_from,
            to = %current_to,
            count = bars.len(),
            "backfill chunk committed"
        );

        current_from = current_to;
    }

    store
        .prune(key, max_stored_bars)
        .await
        .with_context(|| format!("failed to prune {key}"))?;

    info!(bars = total, "incremental fetch complete");
    Ok(())
}
