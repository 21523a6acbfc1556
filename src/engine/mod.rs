//! Incident aggregation: Count-weighted flow statistics, volume-weighted
//! percentile ranking and top-N derivation.
//!
//! Everything here is pure. Functions never perform I/O and never fail on
//! data shape; an empty input is reported as [`FlowOutcome::NoData`].

pub mod flow;
pub mod percentile;
pub mod stats;
pub mod top_n;

pub use flow::{aggregate_flow, CategoryEdge, CategoryNode, FlowGraph, FlowOutcome};
pub use percentile::{rank_by_hours, PercentileBounds, Ranked};
pub use stats::{
    compute_stats, compute_stats_by, top_by_count, top_by_hours, weighted_mean, KeyStats,
    WeightedStats,
};
pub use top_n::{select_top_related, select_top_teams};
