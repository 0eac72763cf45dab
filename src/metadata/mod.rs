//! Batch-level metadata aggregation.

mod aggregator;

pub use aggregator::{aggregate, AggregateCache, BatchMetadata, ScoreDistribution};
