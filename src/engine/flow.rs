use std::collections::BTreeMap;

use serde::Serialize;

use super::percentile::{rank_by_hours, PercentileBounds, Ranked};
use super::stats::WeightedStats;
use crate::types::{Dimension, IncidentRecord};

/// One distinct value within one stage of the flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub key: String,
    pub stage: usize,
    pub dimension: Dimension,
    /// Σ Count over `group`.
    pub size: f64,
    /// Count-weighted mean Hours over `group`.
    pub hours: f64,
    /// Indices into the rows slice the flow was built from.
    #[serde(skip)]
    pub group: Vec<usize>,
    pub cumulative: f64,
    pub percent_rank: f64,
}

/// Flow between two nodes of adjacent stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEdge {
    /// Index into [`FlowGraph::nodes`].
    pub source: usize,
    /// Index into [`FlowGraph::nodes`].
    pub target: usize,
    pub size: f64,
    pub hours: f64,
    #[serde(skip)]
    pub group: Vec<usize>,
    pub cumulative: f64,
    pub percent_rank: f64,
}

macro_rules! impl_ranked {
    ($ty:ty) => {
        impl Ranked for $ty {
            fn size(&self) -> f64 {
                self.size
            }
            fn hours(&self) -> f64 {
                self.hours
            }
            fn set_rank(&mut self, cumulative: f64, percent_rank: f64) {
                self.cumulative = cumulative;
                self.percent_rank = percent_rank;
            }
        }
    };
}

impl_ranked!(CategoryNode);
impl_ranked!(CategoryEdge);

#[derive(Debug, Clone, Serialize)]
pub struct FlowGraph {
    pub dimensions: Vec<Dimension>,
    /// Ordered by stage, then key.
    pub nodes: Vec<CategoryNode>,
    /// Ordered by source stage, then source key, then target key.
    pub edges: Vec<CategoryEdge>,
    pub node_bounds: Option<PercentileBounds>,
    pub edge_bounds: Option<PercentileBounds>,
}

impl FlowGraph {
    pub fn stage_nodes(&self, stage: usize) -> impl Iterator<Item = &CategoryNode> {
        self.nodes.iter().filter(move |n| n.stage == stage)
    }

    pub fn node(&self, index: usize) -> Option<&CategoryNode> {
        self.nodes.get(index)
    }

    /// Re-aggregate a node from raw rows; equals the stored statistics.
    pub fn recompute(&self, rows: &[&IncidentRecord], node: &CategoryNode) -> WeightedStats {
        WeightedStats::from_rows(node.group.iter().filter_map(|&i| rows.get(i).copied()))
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    /// The filtered input was empty. The renderer shows an explicit notice.
    NoData,
    Graph(FlowGraph),
}

impl FlowOutcome {
    pub fn graph(&self) -> Option<&FlowGraph> {
        match self {
            FlowOutcome::NoData => None,
            FlowOutcome::Graph(g) => Some(g),
        }
    }
}

#[derive(Default)]
struct Bucket {
    stats: WeightedStats,
    group: Vec<usize>,
}

impl Bucket {
    fn push(&mut self, index: usize, row: &IncidentRecord) {
        self.stats.add(row);
        self.group.push(index);
    }
}

/// Group `rows` by the ordered `dimensions` into a multi-stage flow.
///
/// Every distinct value of every stage becomes a node; every adjacent-stage
/// value pair seen on at least one row becomes an edge. Statistics are
/// Count-weighted and both nodes and edges are percentile-ranked by Hours.
pub fn aggregate_flow(rows: &[&IncidentRecord], dimensions: &[Dimension]) -> FlowOutcome {
    if rows.is_empty() || dimensions.is_empty() {
        tracing::debug!(rows = rows.len(), stages = dimensions.len(), "没有可聚合的数据");
        return FlowOutcome::NoData;
    }

    let mut node_buckets: BTreeMap<(usize, &str), Bucket> = BTreeMap::new();
    let mut edge_buckets: BTreeMap<(usize, &str, &str), Bucket> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        for (stage, &dimension) in dimensions.iter().enumerate() {
            node_buckets
                .entry((stage, row.value(dimension)))
                .or_default()
                .push(index, row);
        }
        for (stage, pair) in dimensions.windows(2).enumerate() {
            edge_buckets
                .entry((stage, row.value(pair[0]), row.value(pair[1])))
                .or_default()
                .push(index, row);
        }
    }

    let mut node_index: BTreeMap<(usize, &str), usize> = BTreeMap::new();
    let mut nodes = Vec::with_capacity(node_buckets.len());
    for ((stage, key), bucket) in node_buckets {
        node_index.insert((stage, key), nodes.len());
        nodes.push(CategoryNode {
            key: key.to_string(),
            stage,
            dimension: dimensions[stage],
            size: bucket.stats.size,
            hours: bucket.stats.hours(),
            group: bucket.group,
            cumulative: 0.0,
            percent_rank: 0.0,
        });
    }

    let mut edges = Vec::with_capacity(edge_buckets.len());
    for ((stage, source_key, target_key), bucket) in edge_buckets {
        let (Some(&source), Some(&target)) = (
            node_index.get(&(stage, source_key)),
            node_index.get(&(stage + 1, target_key)),
        ) else {
            continue;
        };
        edges.push(CategoryEdge {
            source,
            target,
            size: bucket.stats.size,
            hours: bucket.stats.hours(),
            group: bucket.group,
            cumulative: 0.0,
            percent_rank: 0.0,
        });
    }

    let node_bounds = rank_by_hours(&mut nodes);
    let edge_bounds = rank_by_hours(&mut edges);

    tracing::debug!(
        rows = rows.len(),
        nodes = nodes.len(),
        edges = edges.len(),
        "流向聚合完成"
    );

    FlowOutcome::Graph(FlowGraph {
        dimensions: dimensions.to_vec(),
        nodes,
        edges,
        node_bounds,
        edge_bounds,
    })
}
