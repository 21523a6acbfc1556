//! Service dependency graph enriched with incident statistics.

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::{weighted_mean, WeightedStats};
use crate::types::{IncidentRecord, RelationEdge};

pub const MIN_RADIUS: f64 = 1.0;
pub const MAX_RADIUS: f64 = 30.0;
pub const MIN_EDGE_WIDTH: f64 = 1.0;
pub const MAX_EDGE_WIDTH: f64 = 6.0;

/// Per-service totals joined onto the relation graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ServiceStats {
    pub total_hours: f64,
    pub count: f64,
    pub hours: f64,
}

impl From<WeightedStats> for ServiceStats {
    fn from(stats: WeightedStats) -> Self {
        Self {
            total_hours: stats.total_hours,
            count: stats.size,
            hours: weighted_mean(stats.total_hours, stats.size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceGraphNode {
    pub name: String,
    #[serde(flatten)]
    pub stats: ServiceStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceGraphEdge {
    /// Index into [`ServiceGraph::nodes`].
    pub source: usize,
    /// Index into [`ServiceGraph::nodes`].
    pub target: usize,
    /// Number of identical relation rows collapsed into this edge.
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceGraph {
    pub nodes: Vec<ServiceGraphNode>,
    pub edges: Vec<ServiceGraphEdge>,
}

impl ServiceGraph {
    pub fn node(&self, name: &str) -> Option<&ServiceGraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn max_count(&self) -> f64 {
        self.nodes.iter().map(|n| n.stats.count).fold(0.0, f64::max)
    }

    /// Marker radius for a node, area-proportional to its incident count.
    pub fn radius_scale(&self) -> SqrtScale {
        SqrtScale::new(self.max_count(), MIN_RADIUS, MAX_RADIUS)
    }

    /// Stroke width for an edge, scaled on how many relation rows it collapses.
    pub fn width_scale(&self) -> SqrtScale {
        let max_edge = self.edges.iter().map(|e| e.count).max().unwrap_or(0);
        SqrtScale::new(max_edge as f64, MIN_EDGE_WIDTH, MAX_EDGE_WIDTH)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// `Σ Hours·Count` and `Σ Count` per service.
pub fn service_stats(rows: &[IncidentRecord]) -> HashMap<&str, ServiceStats> {
    let mut totals: HashMap<&str, WeightedStats> = HashMap::new();
    for row in rows {
        totals.entry(row.service.as_str()).or_default().add(row);
    }
    totals.into_iter().map(|(k, v)| (k, v.into())).collect()
}

/// Join incident statistics onto every service named by `relations`.
///
/// Services without incidents get zeroed statistics. Nodes appear in
/// first-seen order; duplicate relation rows collapse into one counted edge.
pub fn build_service_graph(rows: &[IncidentRecord], relations: &[RelationEdge]) -> ServiceGraph {
    let stats = service_stats(rows);
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut nodes: Vec<ServiceGraphNode> = Vec::new();
    let mut edges: Vec<ServiceGraphEdge> = Vec::new();
    let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();

    for relation in relations {
        let mut ids = [0usize; 2];
        for (slot, name) in [relation.source.as_str(), relation.target.as_str()]
            .into_iter()
            .enumerate()
        {
            ids[slot] = *index.entry(name).or_insert_with(|| {
                nodes.push(ServiceGraphNode {
                    name: name.to_string(),
                    stats: stats.get(name).copied().unwrap_or_default(),
                });
                nodes.len() - 1
            });
        }
        let [source, target] = ids;
        match edge_index.get(&(source, target)) {
            Some(&i) => edges[i].count += 1,
            None => {
                edge_index.insert((source, target), edges.len());
                edges.push(ServiceGraphEdge {
                    source,
                    target,
                    count: 1,
                });
            }
        }
    }

    let missing = nodes.iter().filter(|n| n.stats.count == 0.0).count();
    if missing > 0 {
        tracing::debug!(services = missing, "部分服务没有事件数据，统计值置零");
    }
    tracing::debug!(nodes = nodes.len(), edges = edges.len(), "服务关系图构建完成");

    ServiceGraph { nodes, edges }
}

/// Distinct neighbours of `service` across all relations, in first-seen order.
pub fn neighbours<'a>(relations: &'a [RelationEdge], service: &str) -> Vec<&'a str> {
    let mut seen: Vec<&'a str> = Vec::new();
    for relation in relations {
        if let Some(other) = relation.other_end(service) {
            if !seen.contains(&other) {
                seen.push(other);
            }
        }
    }
    seen
}

/// Every opposite endpoint of `service`, duplicates kept, in relation order.
pub fn related_services<'a>(relations: &'a [RelationEdge], service: &str) -> Vec<&'a str> {
    relations
        .iter()
        .filter_map(|r| r.other_end(service))
        .collect()
}

/// Square-root scale from `[0, domain_max]` onto `[range_min, range_max]`, clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqrtScale {
    domain_max: f64,
    range_min: f64,
    range_max: f64,
}

impl SqrtScale {
    pub fn new(domain_max: f64, range_min: f64, range_max: f64) -> Self {
        Self {
            domain_max,
            range_min,
            range_max,
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        if !(self.domain_max > 0.0) || !value.is_finite() || value <= 0.0 {
            return self.range_min;
        }
        let t = (value.min(self.domain_max) / self.domain_max).sqrt();
        self.range_min + (self.range_max - self.range_min) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(service: &str, count: f64, hours: f64) -> IncidentRecord {
        IncidentRecord {
            service: service.to_string(),
            count,
            hours,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_service_gets_zero_stats() {
        let rows = vec![row("X", 2.0, 3.0)];
        let relations = vec![RelationEdge::new("X", "Y")];
        let graph = build_service_graph(&rows, &relations);
        let y = graph.node("Y").unwrap();
        assert_eq!(
            y.stats,
            ServiceStats {
                total_hours: 0.0,
                count: 0.0,
                hours: 0.0
            }
        );
        let x = graph.node("X").unwrap();
        assert_eq!(x.stats.total_hours, 6.0);
        assert_eq!(x.stats.count, 2.0);
        assert_eq!(x.stats.hours, 3.0);
    }

    #[test]
    fn test_duplicate_relations_collapse() {
        let relations = vec![
            RelationEdge::new("A", "B"),
            RelationEdge::new("A", "B"),
            RelationEdge::new("B", "C"),
        ];
        let graph = build_service_graph(&[], &relations);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].count, 2);
        assert_eq!(graph.nodes[graph.edges[1].source].name, "B");

        let width = graph.width_scale();
        assert_eq!(width.scale(2.0), MAX_EDGE_WIDTH);
        let single = MIN_EDGE_WIDTH + (MAX_EDGE_WIDTH - MIN_EDGE_WIDTH) * 0.5_f64.sqrt();
        assert!((width.scale(1.0) - single).abs() < 1e-12);
    }

    #[test]
    fn test_service_stats_weighted() {
        let rows = vec![row("X", 10.0, 2.0), row("X", 5.0, 8.0)];
        let stats = service_stats(&rows);
        assert_eq!(stats["X"].count, 15.0);
        assert!((stats["X"].hours - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sqrt_scale_is_area_proportional() {
        let scale = SqrtScale::new(100.0, 0.0, 10.0);
        assert_eq!(scale.scale(100.0), 10.0);
        assert_eq!(scale.scale(25.0), 5.0);
        assert_eq!(scale.scale(0.0), 0.0);
        assert_eq!(scale.scale(1000.0), 10.0);
    }

    #[test]
    fn test_sqrt_scale_zero_domain() {
        let scale = SqrtScale::new(0.0, MIN_RADIUS, MAX_RADIUS);
        assert_eq!(scale.scale(5.0), MIN_RADIUS);
    }

    #[test]
    fn test_neighbours_and_related() {
        let relations = vec![
            RelationEdge::new("A", "B"),
            RelationEdge::new("C", "A"),
            RelationEdge::new("A", "B"),
        ];
        assert_eq!(neighbours(&relations, "A"), vec!["B", "C"]);
        assert_eq!(related_services(&relations, "A"), vec!["B", "C", "B"]);
        assert!(neighbours(&relations, "Z").is_empty());
    }
}
