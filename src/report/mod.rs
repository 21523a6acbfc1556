//! Rendering hand-off: serializable views of the flow diagram, the service
//! graph and the filter state, plus their plain-text forms.

use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

use crate::color::{ColorPolicy, FixedScale, Rgb};
use crate::engine::{FlowGraph, FlowOutcome};
use crate::filters::{FilterOption, FilterState};
use crate::narrative::prompts::{num0, num2};
use crate::relations::ServiceGraph;
use crate::session::FlowScales;
use crate::types::Dimension;

pub const NO_DATA_NOTICE: &str = "No data available for the selected filters.";
pub const NO_RELATIONS_NOTICE: &str = "No relation data loaded.";

#[derive(Debug, Clone, Serialize)]
pub struct FlowNodeView {
    pub stage: usize,
    pub dimension: Dimension,
    pub key: String,
    pub label: String,
    pub size: f64,
    pub hours: f64,
    pub cumulative: f64,
    pub percent_rank: f64,
    pub color: Rgb,
    /// `false` when the percentile cutoff greys the node out.
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowEdgeView {
    pub source: String,
    pub target: String,
    pub label: String,
    pub size: f64,
    pub hours: f64,
    pub percent_rank: f64,
    /// Only colored when links are shown.
    pub color: Option<Rgb>,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub dimensions: Vec<Dimension>,
    pub threshold: f64,
    pub color_policy: ColorPolicy,
    pub show_links: bool,
    pub nodes: Vec<FlowNodeView>,
    pub edges: Vec<FlowEdgeView>,
}

/// Node label: the full team name when the key is a known acronym for one.
pub fn node_label(key: &str, hours: f64, team_names: &HashMap<String, String>) -> String {
    match team_names.get(key) {
        Some(full_name) if full_name != key => format!("{full_name}: {} hours", num2(hours)),
        _ => format!("{key}: {} hours", num2(hours)),
    }
}

pub fn flow_report(
    graph: &FlowGraph,
    scales: &FlowScales,
    team_names: &HashMap<String, String>,
    threshold: f64,
    color_policy: ColorPolicy,
    show_links: bool,
) -> FlowReport {
    let nodes = graph
        .nodes
        .iter()
        .map(|node| FlowNodeView {
            stage: node.stage,
            dimension: node.dimension,
            key: node.key.clone(),
            label: node_label(&node.key, node.hours, team_names),
            size: node.size,
            hours: node.hours,
            cumulative: node.cumulative,
            percent_rank: node.percent_rank,
            color: scales.nodes.color(node.hours, node.percent_rank),
            visible: scales.nodes.is_visible(node.percent_rank),
        })
        .collect();

    let key_of = |index: usize| graph.node(index).map(|n| n.key.clone()).unwrap_or_default();
    let edges = graph
        .edges
        .iter()
        .map(|edge| {
            let (source, target) = (key_of(edge.source), key_of(edge.target));
            FlowEdgeView {
                label: format!("{source} - {target}: {} hours", num2(edge.hours)),
                source,
                target,
                size: edge.size,
                hours: edge.hours,
                percent_rank: edge.percent_rank,
                color: show_links.then(|| scales.edges.color(edge.hours, edge.percent_rank)),
                visible: scales.edges.is_visible(edge.percent_rank),
            }
        })
        .collect();

    FlowReport {
        dimensions: graph.dimensions.clone(),
        threshold,
        color_policy,
        show_links,
        nodes,
        edges,
    }
}

/// Text form of a flow outcome; `NoData` renders the empty-state notice.
pub fn render_flow_text(outcome: &FlowOutcome, report: Option<&FlowReport>) -> String {
    let (FlowOutcome::Graph(_), Some(report)) = (outcome, report) else {
        return format!("{NO_DATA_NOTICE}\n");
    };

    let mut out = String::new();
    let stages: Vec<String> = report.dimensions.iter().map(|d| d.to_string()).collect();
    let _ = writeln!(out, "Flow: {}", stages.join(" → "));
    let _ = writeln!(
        out,
        "Threshold: {} hours ({} colors)",
        num2(report.threshold),
        report.color_policy
    );

    for (stage, dimension) in report.dimensions.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {dimension}");
        for node in report.nodes.iter().filter(|n| n.stage == stage) {
            let marker = if node.visible { "" } else { " (muted)" };
            let _ = writeln!(
                out,
                "  {:<32} {:>8} incidents  rank {:>5.2}  {}{}",
                node.label,
                num0(node.size),
                node.percent_rank,
                node.color,
                marker
            );
        }
    }

    if report.show_links {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Links");
        for edge in &report.edges {
            let color = edge.color.map(|c| c.to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "  {:<48} {:>8} incidents  {}",
                edge.label,
                num0(edge.size),
                color
            );
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceNodeView {
    pub name: String,
    pub total_hours: f64,
    pub count: f64,
    pub hours: f64,
    pub label: String,
    pub color: Rgb,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceEdgeView {
    pub source: String,
    pub target: String,
    pub count: usize,
    pub width: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub threshold: f64,
    pub nodes: Vec<ServiceNodeView>,
    pub edges: Vec<ServiceEdgeView>,
}

/// Service graph nodes are always colored on the fixed duration scale.
pub fn graph_report(graph: &ServiceGraph, threshold: f64) -> GraphReport {
    let scale = FixedScale::new(threshold);
    let radius = graph.radius_scale();
    let nodes = graph
        .nodes
        .iter()
        .map(|node| ServiceNodeView {
            name: node.name.clone(),
            total_hours: node.stats.total_hours,
            count: node.stats.count,
            hours: node.stats.hours,
            label: format!(
                "{}: {} hours, {} incidents",
                node.name,
                num2(node.stats.hours),
                num0(node.stats.count)
            ),
            color: scale.color(node.stats.hours),
            radius: radius.scale(node.stats.count),
        })
        .collect();
    let width = graph.width_scale();
    let name_of = |i: usize| graph.nodes.get(i).map(|n| n.name.clone()).unwrap_or_default();
    let edges = graph
        .edges
        .iter()
        .map(|edge| ServiceEdgeView {
            source: name_of(edge.source),
            target: name_of(edge.target),
            count: edge.count,
            width: width.scale(edge.count as f64),
        })
        .collect();
    GraphReport {
        threshold: scale.threshold(),
        nodes,
        edges,
    }
}

/// `None` means no incident rows were loaded.
pub fn render_graph_text(report: Option<&GraphReport>) -> String {
    let Some(report) = report else {
        return format!("{NO_DATA_NOTICE}\n");
    };
    if report.nodes.is_empty() {
        return format!("{NO_RELATIONS_NOTICE}\n");
    }
    let mut out = String::new();
    let _ = writeln!(out, "## Services");
    for node in &report.nodes {
        let _ = writeln!(
            out,
            "  {:<48} r={:>5.1}  {}",
            node.label, node.radius, node.color
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Relations");
    for edge in &report.edges {
        let repeat = if edge.count > 1 {
            format!(" (x{})", edge.count)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "  {} → {}{}  w={:.1}",
            edge.source, edge.target, repeat, edge.width
        );
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterView<'a> {
    pub dimension: Dimension,
    pub selected: usize,
    pub options: Vec<&'a FilterOption>,
}

/// One view per filter dimension. With `search`, only matching options are listed.
pub fn filter_views<'a>(filters: &'a FilterState, search: Option<&str>) -> Vec<FilterView<'a>> {
    filters
        .dimensions()
        .map(|dimension| {
            let options = match search {
                Some(text) => filters.search(dimension, text),
                None => filters.display_options(dimension),
            };
            FilterView {
                dimension,
                selected: options.iter().filter(|o| o.selected).count(),
                options,
            }
        })
        .collect()
}

pub fn render_filters_text(views: &[FilterView<'_>]) -> String {
    let mut out = String::new();
    for view in views {
        let _ = writeln!(
            out,
            "## {} ({} of {} selected)",
            view.dimension,
            view.selected,
            view.options.len()
        );
        for option in &view.options {
            let mark = if option.selected { "[x]" } else { "[ ]" };
            let value = if option.value.is_empty() {
                "(empty)"
            } else {
                option.value.as_str()
            };
            let _ = writeln!(out, "  {mark} {value}");
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorScale, GREEN, RED};
    use crate::engine::aggregate_flow;
    use crate::relations::{build_service_graph, MAX_EDGE_WIDTH};
    use crate::types::{IncidentRecord, RelationEdge};

    fn row(acro: &str, service: &str, count: f64, hours: f64) -> IncidentRecord {
        IncidentRecord {
            team_acro: acro.to_string(),
            team: format!("{acro} Team"),
            service: service.to_string(),
            count,
            hours,
            ..Default::default()
        }
    }

    fn fixed_scales() -> FlowScales {
        let scale = ColorScale::new(ColorPolicy::Fixed, 3.0, None);
        FlowScales {
            nodes: scale,
            edges: scale,
        }
    }

    #[test]
    fn test_node_label_uses_full_team_name() {
        let mut names = HashMap::new();
        names.insert("AT".to_string(), "Alpha Team".to_string());
        names.insert("CTR".to_string(), "CTR".to_string());
        assert_eq!(node_label("AT", 2.5, &names), "Alpha Team: 2.50 hours");
        assert_eq!(node_label("CTR", 1.0, &names), "CTR: 1.00 hours");
        assert_eq!(node_label("X", 0.0, &names), "X: 0.00 hours");
    }

    #[test]
    fn test_flow_report_colors_and_links() {
        let data = [row("AT", "CTR", 2.0, 1.0), row("BT", "CTR", 1.0, 9.0)];
        let rows: Vec<&IncidentRecord> = data.iter().collect();
        let outcome = aggregate_flow(&rows, &[Dimension::TeamAcro, Dimension::Service]);
        let graph = outcome.graph().unwrap();

        let hidden = flow_report(
            graph,
            &fixed_scales(),
            &HashMap::new(),
            3.0,
            ColorPolicy::Fixed,
            false,
        );
        assert!(hidden.edges.iter().all(|e| e.color.is_none()));
        let at = hidden.nodes.iter().find(|n| n.key == "AT").unwrap();
        assert_eq!(at.color, GREEN);
        let bt = hidden.nodes.iter().find(|n| n.key == "BT").unwrap();
        assert_eq!(bt.color, RED);

        let shown = flow_report(
            graph,
            &fixed_scales(),
            &HashMap::new(),
            3.0,
            ColorPolicy::Fixed,
            true,
        );
        assert!(shown.edges.iter().all(|e| e.color.is_some()));
        assert_eq!(shown.edges[0].label, "AT - CTR: 1.00 hours");

        let text = render_flow_text(&outcome, Some(&shown));
        assert!(text.contains("## Team Acro"));
        assert!(text.contains("## Links"));
    }

    #[test]
    fn test_no_data_notice() {
        let text = render_flow_text(&FlowOutcome::NoData, None);
        assert_eq!(text.trim_end(), NO_DATA_NOTICE);
    }

    #[test]
    fn test_graph_report_radius_and_label() {
        let incidents = vec![row("AT", "X", 4.0, 2.0)];
        let relations = vec![RelationEdge::new("X", "Y")];
        let graph = build_service_graph(&incidents, &relations);
        let report = graph_report(&graph, 3.0);
        let x = &report.nodes[0];
        assert_eq!(x.label, "X: 2.00 hours, 4 incidents");
        assert_eq!(x.radius, 30.0);
        let y = &report.nodes[1];
        assert_eq!(y.radius, 1.0);
        assert_eq!(y.color, GREEN);
        assert_eq!(report.edges[0].source, "X");
        assert_eq!(report.edges[0].width, MAX_EDGE_WIDTH);
        assert!(render_graph_text(Some(&report)).contains("X → Y  w=6.0"));
    }

    #[test]
    fn test_filters_text_marks_selection() {
        let rows = vec![row("AT", "CTR", 1.0, 1.0), row("BT", "Zeta", 1.0, 1.0)];
        let config = crate::config::DashboardConfig::default();
        let filters = FilterState::new(config.filter_policy(), &rows);
        let views = filter_views(&filters, None);
        let service = views.iter().find(|v| v.dimension == Dimension::Service).unwrap();
        assert_eq!(service.selected, 1);
        assert_eq!(service.options[0].value, "CTR");
        let text = render_filters_text(&views);
        assert!(text.contains("## Service (1 of 2 selected)"));
        assert!(text.contains("  [x] CTR"));
        assert!(text.contains("  [ ] Zeta"));
    }
}
