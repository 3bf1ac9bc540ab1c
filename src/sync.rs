// =============================================================================
// TimeSynchronizer - walk-forward replay across multiple instruments
// =============================================================================
//
// Replays a group of series through time without look-ahead: at every anchor
// the view exposed for each instrument contains only bars with
// `time <= anchor`. Two axes are configurable:
//
//   clock     - where the anchor sequence comes from (`SyncClock`):
//               the master instrument's own bar times, or the union of all
//               instruments' bar dates normalized to midnight UTC;
//   strategy  - how views are materialized (`SyncStrategy`):
//               `FastSync` keeps full history in memory and slices it,
//               `MemoryEfficientSync` re-reads a bounded tail from the store
//               at every anchor.
//
// Both strategies agree on what is visible at a given anchor; they trade
// memory for store traffic, nothing else. An instrument with no bar at or
// before the anchor has no view (`view` returns `None`), uniformly across
// strategies.
// =============================================================================

use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, info};

use crate::series::Series;

/// Where the anchor sequence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncClock {
    /// Anchors are the master instrument's own bar times.
    MasterDriven,
    /// Anchors are the union of every instrument's bar dates, normalized to
    /// midnight UTC. Useful when instruments trade on different calendars.
    GlobalGrid,
}

/// A view-materialization strategy for the synchronizer.
///
/// `prepare` runs once before the first anchor; `advance` moves the visible
/// state to the given anchor. `view` is `None` for an instrument with no bar
/// at or before the current anchor.
#[async_trait]
pub trait SyncStrategy: Send {
    async fn prepare(&mut self) -> Result<()>;

    /// Bar times of the master instrument, ascending.
    fn master_times(&self) -> Vec<DateTime<Utc>>;

    /// Union of all instruments' bar times, ascending and deduplicated.
    fn observed_times(&self) -> Vec<DateTime<Utc>>;

    async fn advance(&mut self, anchor: DateTime<Utc>) -> Result<()>;

    fn view(&self, instrument: &str) -> Option<&Series>;

    fn instruments(&self) -> Vec<String>;
}

// Union of bar times across a set of series.
fn union_times(series: &[Series]) -> Vec<DateTime<Utc>> {
    let mut times = BTreeSet::new();
    for s in series {
        times.extend(s.bars().iter().map(|b| b.time));
    }
    times.into_iter().collect()
}

// -----------------------------------------------------------------------------
// FastSync - full history resident in memory
// -----------------------------------------------------------------------------

/// Keeps every source series fully loaded and materializes per-anchor views
/// by slicing the in-memory history. Fastest to advance, heaviest to hold.
pub struct FastSync {
    sources: Vec<Series>,
    master_index: usize,
    max_buffer_size: usize,
    views: HashMap<String, Series>,
}

impl FastSync {
    /// `max_buffer_size` caps how many trailing bars each view holds
    /// (0 = unlimited). The first series is the master clock.
    pub fn new(sources: Vec<Series>, max_buffer_size: usize) -> Result<Self> {
        Self::with_master(sources, 0, max_buffer_size)
    }

    /// Like [`new`](Self::new) with an explicit master series.
    pub fn with_master(
        sources: Vec<Series>,
        master_index: usize,
        max_buffer_size: usize,
    ) -> Result<Self> {
        if sources.is_empty() {
            bail!("synchronizer needs at least one series");
        }
        if master_index >= sources.len() {
            bail!(
                "master index {} out of range for {} series",
                master_index,
                sources.len()
            );
        }
        Ok(Self {
            sources,
            master_index,
            max_buffer_size,
            views: HashMap::new(),
        })
    }

    /// Move the view for `instrument` out of the synchronizer, leaving no
    /// view behind until the next `advance`.
    pub fn take_view(&mut self, instrument: &str) -> Option<Series> {
        self.views.remove(instrument)
    }
}

#[async_trait]
impl SyncStrategy for FastSync {
    async fn prepare(&mut self) -> Result<()> {
        for series in &mut self.sources {
            series.buffer_mut().load(None, None).await?;
        }
        info!(series = self.sources.len(), "fast sync prepared");
        Ok(())
    }

    fn master_times(&self) -> Vec<DateTime<Utc>> {
        self.sources[self.master_index]
            .bars()
            .iter()
            .map(|b| b.time)
            .collect()
    }

    fn observed_times(&self) -> Vec<DateTime<Utc>> {
        union_times(&self.sources)
    }

    async fn advance(&mut self, anchor: DateTime<Utc>) -> Result<()> {
        self.views.clear();
        for source in &self.sources {
            let bars = source.bars();
            // Number of bars visible at the anchor.
            let visible = bars.partition_point(|b| b.time <= anchor);
            if visible == 0 {
                continue;
            }
            let from = if self.max_buffer_size > 0 && visible > self.max_buffer_size {
                visible - self.max_buffer_size
            } else {
                0
            };

            let buffer = source.buffer();
            let mut view = Series::detached(
                buffer.store().clone(),
                source.instrument(),
                source.interval(),
                buffer.factor(),
                source.risk_free_rate(),
            );
            // Source bars are already scaled; install them verbatim.
            view.install_bars(bars[from..visible].to_vec());
            self.views.insert(source.instrument().to_string(), view);
        }
        debug!(anchor = %anchor, views = self.views.len(), "fast sync advanced");
        Ok(())
    }

    fn view(&self, instrument: &str) -> Option<&Series> {
        self.views.get(instrument)
    }

    fn instruments(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.instrument().to_string())
            .collect()
    }
}

// -----------------------------------------------------------------------------
// MemoryEfficientSync - bounded tail re-read from the store per anchor
// -----------------------------------------------------------------------------

/// Holds only a bounded trailing window per instrument and re-reads it from
/// the store at every anchor. Slower to advance, bounded in memory.
pub struct MemoryEfficientSync {
    series: Vec<Series>,
    // Per-series bar times, captured once during prepare.
    times: Vec<Vec<DateTime<Utc>>>,
    master_index: usize,
    max_buffer_size: usize,
    // Indices of series with no visible bar at the current anchor.
    absent: Vec<bool>,
}

impl MemoryEfficientSync {
    /// `max_buffer_size` caps the trailing window per instrument
    /// (0 = unlimited, which defeats the memory bound but stays correct).
    /// The first series is the master clock.
    pub fn new(series: Vec<Series>, max_buffer_size: usize) -> Result<Self> {
        Self::with_master(series, 0, max_buffer_size)
    }

    /// Like [`new`](Self::new) with an explicit master series.
    pub fn with_master(
        series: Vec<Series>,
        master_index: usize,
        max_buffer_size: usize,
    ) -> Result<Self> {
        if series.is_empty() {
            bail!("synchronizer needs at least one series");
        }
        if master_index >= series.len() {
            bail!(
                "master index {} out of range for {} series",
                master_index,
                series.len()
            );
        }
        let absent = vec![true; series.len()];
        Ok(Self {
            series,
            times: Vec::new(),
            master_index,
            max_buffer_size,
            absent,
        })
    }
}

#[async_trait]
impl SyncStrategy for MemoryEfficientSync {
    async fn prepare(&mut self) -> Result<()> {
        // Capture each series' full time axis once, then drop the history so
        // only the per-anchor tail is ever resident.
        self.times.clear();
        for series in &mut self.series {
            series.buffer_mut().load(None, None).await?;
            self.times
                .push(series.bars().iter().map(|b| b.time).collect());
            series.buffer_mut().clear();
        }
        info!(series = self.series.len(), "memory-efficient sync prepared");
        Ok(())
    }

    fn master_times(&self) -> Vec<DateTime<Utc>> {
        self.times
            .get(self.master_index)
            .cloned()
            .unwrap_or_default()
    }

    fn observed_times(&self) -> Vec<DateTime<Utc>> {
        let mut union = BTreeSet::new();
        for times in &self.times {
            union.extend(times.iter().copied());
        }
        union.into_iter().collect()
    }

    async fn advance(&mut self, anchor: DateTime<Utc>) -> Result<()> {
        for (i, series) in self.series.iter_mut().enumerate() {
            // The captured time axis pins down exactly which bars are
            // visible, so the store read covers precisely the trailing
            // window regardless of calendar gaps.
            let times = &self.times[i];
            let visible = times.partition_point(|t| *t <= anchor);
            if visible == 0 {
                series.install_bars(Vec::new());
                self.absent[i] = true;
                continue;
            }
            let start = if self.max_buffer_size > 0 && visible > self.max_buffer_size {
                visible - self.max_buffer_size
            } else {
                0
            };
            series.buffer_mut().load(Some(times[start]), Some(anchor)).await?;
            // Re-point last_known at the visible tail; the constructor left
            // it at the newest bar in the whole store, which would leak a
            // future close through current_price().
            series.buffer_mut().keep_recent(self.max_buffer_size);
            series.clear_static();
            series.reset_dynamic();
            self.absent[i] = series.buffer().is_empty();
        }
        debug!(
            anchor = %anchor,
            views = self.absent.iter().filter(|a| !**a).count(),
            "memory-efficient sync advanced"
        );
        Ok(())
    }

    fn view(&self, instrument: &str) -> Option<&Series> {
        self.series
            .iter()
            .enumerate()
            .find(|(_, s)| s.instrument() == instrument)
            .filter(|(i, _)| !self.absent[*i])
            .map(|(_, s)| s)
    }

    fn instruments(&self) -> Vec<String> {
        self.series
            .iter()
            .map(|s| s.instrument().to_string())
            .collect()
    }
}

// -----------------------------------------------------------------------------
// TimeSynchronizer
// -----------------------------------------------------------------------------

/// Drives a [`SyncStrategy`] through an anchor sequence derived from a
/// [`SyncClock`].
pub struct TimeSynchronizer<S: SyncStrategy> {
    strategy: S,
    anchors: Vec<DateTime<Utc>>,
    cursor: usize,
    anchor: Option<DateTime<Utc>>,
}

impl<S: SyncStrategy> TimeSynchronizer<S> {
    pub async fn new(mut strategy: S, clock: SyncClock) -> Result<Self> {
        strategy.prepare().await?;
        if strategy.instruments().is_empty() {
            bail!("synchronizer needs at least one instrument");
        }

        let anchors = match clock {
            SyncClock::MasterDriven => strategy.master_times(),
            SyncClock::GlobalGrid => {
                // Distinct dates across all instruments, at midnight UTC.
                let days: BTreeSet<DateTime<Utc>> = strategy
                    .observed_times()
                    .iter()
                    .map(|t| t.date_naive().and_time(NaiveTime::MIN).and_utc())
                    .collect();
                days.into_iter().collect()
            }
        };
        info!(anchors = anchors.len(), ?clock, "synchronizer ready");

        Ok(Self {
            strategy,
            anchors,
            cursor: 0,
            anchor: None,
        })
    }

    /// Step to the next anchor. Returns the anchor it moved to, or `None`
    /// once the sequence is exhausted.
    pub async fn advance(&mut self) -> Result<Option<DateTime<Utc>>> {
        let Some(&anchor) = self.anchors.get(self.cursor) else {
            return Ok(None);
        };
        self.strategy.advance(anchor).await?;
        self.cursor += 1;
        self.anchor = Some(anchor);
        Ok(Some(anchor))
    }

    /// The view for `instrument` at the current anchor, if the instrument
    /// has any visible bar.
    pub fn view(&self, instrument: &str) -> Option<&Series> {
        self.strategy.view(instrument)
    }

    pub fn instruments(&self) -> Vec<String> {
        self.strategy.instruments()
    }

    /// The anchor of the most recent successful `advance`.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    pub fn anchors(&self) -> &[DateTime<Utc>] {
        &self.anchors
    }

    pub fn remaining(&self) -> usize {
        self.anchors.len() - self.cursor
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }
}
