// =============================================================================
// MemoryStore - in-process reference Store implementation
// =============================================================================
//
// Thread-safe map of series key -> time-ordered bars. Backs unit tests and
// in-process research runs; a SQL-backed store implementing the same trait
// is an external collaborator.
// =============================================================================

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::bar::{Bar, SeriesKey};
use crate::store::Store;

/// In-memory candle store. Bars are keyed by time per series, so inserting a
/// bar at an existing time replaces it (upsert).
#[derive(Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<SeriesKey, BTreeMap<DateTime<Utc>, Bar>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bars held for a series. Mainly for tests.
    pub fn len(&self, key: &SeriesKey) -> usize {
        self.series.read().get(key).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn range_query(
        &self,
        key: &SeriesKey,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let map = self.series.read();
        Ok(match map.get(key) {
            Some(bars) => bars.range(from..=to).map(|(_, bar)| *bar).collect(),
            None => Vec::new(),
        })
    }

    async fn last_bar(&self, key: &SeriesKey) -> Result<Option<Bar>> {
        let map = self.series.read();
        Ok(map
            .get(key)
            .and_then(|bars| bars.values().next_back().copied()))
    }

    async fn bar_before(&self, key: &SeriesKey, date: DateTime<Utc>) -> Result<Option<Bar>> {
        let map = self.series.read();
        Ok(map
            .get(key)
            .and_then(|bars| bars.range(..=date).map(|(_, bar)| *bar).next_back()))
    }

    async fn insert_bars(&self, key: &SeriesKey, bars: &[Bar]) -> Result<()> {
        let mut map = self.series.write();
        let entry = map.entry(key.clone()).or_default();
        for bar in bars {
            entry.insert(bar.time, *bar);
        }
        Ok(())
    }

    async fn drop_series(&self, key: &SeriesKey) -> Result<()> {
        self.series.write().remove(key);
        Ok(())
    }

    async fn prune(&self, key: &SeriesKey, keep: usize) -> Result<()> {
        if keep == 0 {
            return Ok(());
        }
        let mut map = self.series.write();
        if let Some(bars) = map.get_mut(key) {
            while bars.len() > keep {
                let oldest = match bars.keys().next() {
                    Some(t) => *t,
                    None => break,
                };
                bars.remove(&oldest);
            }
        }
        Ok(())
    }
}
