//! FILENAME: trend-engine/src/lib.rs
//! Defect trend pivot engine.
//!
//! Folds inspection records into a group x time-bucket grid of defect rates.
//! Granularity (day, week, month, year) is a strategy; everything after
//! time bucketing is granularity-agnostic.
//!
//! Layers:
//! - `time_key`: Bucketing strategies and bucket keys
//! - `definition`: Serializable configuration (what the report IS)
//! - `hierarchy`: Group -> bucket accumulation (HOW we aggregate)
//! - `view`: Renderable output (WHAT we display)
//! - `engine`: Row projection and the full pipeline
//! - `severity`: Rate to severity band classification

pub mod catalog;
pub mod definition;
pub mod engine;
pub mod hierarchy;
pub mod severity;
pub mod sort;
pub mod time_key;
pub mod view;

pub use catalog::{CatalogCode, CatalogEntry, DefectCatalog};
pub use definition::*;
pub use engine::{calculate_trend, compare_groups, Projection, RowProjector, TrendCalculator};
pub use hierarchy::{build, defect_rate, BucketEntry, GroupKey, Hierarchy, HierarchyBuilder, HierarchyNode};
pub use severity::*;
pub use sort::{natural_cmp, natural_cmp_keys};
pub use time_key::{
    default_window, parse_timestamp, DayBuckets, Granularity, MonthBuckets, TimeKey,
    TimeKeyExtractor, TimeKeyParseError, WeekBuckets, YearBuckets,
};
pub use view::*;
