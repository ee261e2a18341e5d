//! Analysis modules.
//!
//! Reference extraction feeds the aggregation engine, which produces
//! the sprint metrics.

pub mod aggregator;
pub mod extractor;

pub use aggregator::{AggregationConfig, AggregationEngine, ProgressSink};
pub use extractor::ReferenceExtractor;
