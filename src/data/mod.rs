//! Data module - CSV loading and the pivot/aggregation engine

mod loader;
mod processor;

pub use loader::{load, load_sources, LoadError, LoadOutcome, Record, RecordSet, SourceFailure};
pub use processor::{
    aggregate, allocator_summary, pivot, AggFn, AllocatorStats, EngineError, Metric, PivotView,
};
