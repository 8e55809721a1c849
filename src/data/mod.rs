/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  observations .csv / .json / .parquet     forecast.csv    cluster_summary.csv
///        │                                       │                 │
///        ▼                                       ▼                 ▼
///   ┌──────────┐   memoised per path   ┌──────────────────────────────────┐
///   │  loader   │ ◄──────────────────── │ cache (DataCache, Arc<T> per file)│
///   └──────────┘                        └──────────────────────────────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ ObservationTable  │  Vec<Observation>, region codes, year bounds
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  regions × year interval → row indices
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  trend, distribution, per-month, per-region, forecast
///   └───────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod cluster;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
