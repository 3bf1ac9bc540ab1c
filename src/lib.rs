// =============================================================================
// tempora - look-ahead-free candle analytics for walk-forward research
// =============================================================================

//! Candle (OHLCV) analytics over persistent bar storage, built for
//! walk-forward research where look-ahead is a correctness bug.
//!
//! The layers, bottom up:
//!
//! - [`bar`] - the [`Bar`](bar::Bar) observation, [`Interval`](bar::Interval)
//!   and the [`SeriesKey`](bar::SeriesKey) that identifies a stored series;
//! - [`store`] - the [`Store`](store::Store) / [`Provider`](store::Provider)
//!   boundary plus the chunked, resumable
//!   [`incremental_fetch`](store::incremental_fetch) backfill loop;
//! - [`buffer`] - [`SeriesBuffer`](buffer::SeriesBuffer), the scaled
//!   in-memory bar window for one series;
//! - [`metrics`] / [`indicators`] - pure static metrics and aligned
//!   indicator sequences;
//! - [`series`] - [`Series`](series::Series), a buffer with memoized static
//!   and dynamic analytics; [`multi`] pairs the daily and hourly series of
//!   one instrument;
//! - [`sync`] - [`TimeSynchronizer`](sync::TimeSynchronizer), replaying a
//!   group of instruments through time without exposing future bars;
//! - [`window`] - [`IsolatedWindowGenerator`](window::IsolatedWindowGenerator),
//!   fixed-size walk-forward windows with cache isolation between steps.

pub mod bar;
pub mod buffer;
pub mod config;
pub mod indicators;
pub mod metrics;
pub mod multi;
pub mod series;
pub mod store;
pub mod sync;
pub mod window;

pub use bar::{Bar, Interval, SeriesKey};
pub use buffer::SeriesBuffer;
pub use config::EngineConfig;
pub use multi::MultiIntervalSeries;
pub use series::{IndicatorKey, IndicatorSeries, Series};
pub use store::{incremental_fetch, MemoryStore, Provider, Store};
pub use sync::{FastSync, MemoryEfficientSync, SyncClock, SyncStrategy, TimeSynchronizer};
pub use window::IsolatedWindowGenerator;
