//! Explicit dashboard session: loaded tables, filter selection and display
//! settings, passed to the pure aggregation functions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::color::{clamp_threshold, ColorPolicy, ColorScale};
use crate::config::DashboardConfig;
use crate::engine::{aggregate_flow, FlowGraph, FlowOutcome};
use crate::filters::FilterState;
use crate::loader::Dataset;
use crate::narrative::{CancellationToken, PromptData, StreamSlot};
use crate::relations::{build_service_graph, ServiceGraph};
use crate::types::{Dimension, IncidentRecord, RelationEdge};

/// Severity scales for one flow graph. Nodes and edges are ranked separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowScales {
    pub nodes: ColorScale,
    pub edges: ColorScale,
}

#[derive(Debug)]
pub struct Session {
    config: DashboardConfig,
    dataset: Dataset,
    filters: FilterState,
    threshold: f64,
    color_policy: ColorPolicy,
    show_links: bool,
    streams: StreamSlot,
}

impl Session {
    pub fn new(config: DashboardConfig, dataset: Dataset) -> Self {
        let filters = FilterState::new(config.filter_policy(), &dataset.incidents);
        Self {
            threshold: clamp_threshold(config.threshold),
            color_policy: config.color_policy,
            show_links: config.show_links,
            config,
            dataset,
            filters,
            streams: StreamSlot::default(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn color_policy(&self) -> ColorPolicy {
        self.color_policy
    }

    pub fn show_links(&self) -> bool {
        self.show_links
    }

    /// Replace the incident table and rebuild the filters from it.
    pub fn load_incidents(&mut self, incidents: Vec<IncidentRecord>) {
        tracing::info!(rows = incidents.len(), "已加载事件数据");
        self.dataset.incidents = incidents;
        self.filters = FilterState::new(self.config.filter_policy(), &self.dataset.incidents);
    }

    pub fn load_relations(&mut self, relations: Vec<RelationEdge>) {
        tracing::info!(relations = relations.len(), "已加载服务关系数据");
        self.dataset.relations = relations;
    }

    fn after_selection_change(&mut self, dimension: Dimension) {
        if dimension == Dimension::Service {
            self.filters.derive_top_teams(&self.dataset.incidents);
        }
    }

    /// Flip one option. Returns `false` when the value is unknown.
    pub fn toggle(&mut self, dimension: Dimension, value: &str) -> bool {
        let known = self.filters.toggle(dimension, value);
        if known {
            self.after_selection_change(dimension);
        }
        known
    }

    pub fn select_all(&mut self, dimension: Dimension, selected: bool) {
        self.filters.select_all(dimension, selected);
        self.after_selection_change(dimension);
    }

    pub fn select_top_k(&mut self, dimension: Dimension, checked: bool) {
        self.filters.select_top_k(dimension, checked);
        self.after_selection_change(dimension);
    }

    /// Select exactly `values`; unknown values are returned.
    pub fn select_only(&mut self, dimension: Dimension, values: &[&str]) -> Vec<String> {
        let unknown: Vec<String> = self
            .filters
            .select_only(dimension, values)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.after_selection_change(dimension);
        unknown
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset(&self.dataset.incidents);
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = clamp_threshold(threshold);
    }

    pub fn set_color_policy(&mut self, policy: ColorPolicy) {
        self.color_policy = policy;
    }

    pub fn set_show_links(&mut self, show_links: bool) {
        self.show_links = show_links;
    }

    pub fn filtered(&self) -> Vec<&IncidentRecord> {
        self.filters.apply(&self.dataset.incidents)
    }

    pub fn selected_services(&self) -> Vec<&str> {
        self.filters.selected_values(Dimension::Service)
    }

    pub fn flow(&self) -> FlowOutcome {
        aggregate_flow(&self.filtered(), &self.config.flow_dimensions)
    }

    /// Color scales for `graph` under the current threshold and policy.
    /// Cheap to rebuild; the graph itself is not re-aggregated.
    pub fn flow_scales(&self, graph: &FlowGraph) -> FlowScales {
        FlowScales {
            nodes: ColorScale::new(self.color_policy, self.threshold, graph.node_bounds),
            edges: ColorScale::new(self.color_policy, self.threshold, graph.edge_bounds),
        }
    }

    /// The relation graph always covers the full incident table.
    /// The relation graph over the full dataset, or `None` when no incident
    /// rows were loaded.
    pub fn service_graph(&self) -> Option<ServiceGraph> {
        if self.dataset.is_empty() {
            return None;
        }
        Some(build_service_graph(
            &self.dataset.incidents,
            &self.dataset.relations,
        ))
    }

    /// `Team Acro` → `Team` over the filtered rows; the last row wins.
    pub fn team_names(&self) -> HashMap<String, String> {
        let mut names = HashMap::new();
        for row in self.filtered() {
            if !row.team_acro.is_empty() && !row.team.is_empty() {
                names.insert(row.team_acro.clone(), row.team.clone());
            }
        }
        names
    }

    /// Cancel any in-flight stream and hand out a token for a new one.
    pub fn begin_stream(&mut self) -> CancellationToken {
        self.streams.begin()
    }

    pub fn cancel_stream(&mut self) {
        self.streams.cancel();
    }

    /// Run `f` with prompt inputs borrowed from this session.
    pub fn with_prompt_data<R>(&self, f: impl FnOnce(&PromptData<'_>) -> R) -> R {
        let rows = self.filtered();
        let services = self.selected_services();
        let data = PromptData {
            rows: &rows,
            relations: &self.dataset.relations,
            selected_services: &services,
        };
        f(&data)
    }
}

/// Single-writer handle: concurrent readers, exclusive writers.
pub type SharedSession = Arc<RwLock<Session>>;

pub fn shared(session: Session) -> SharedSession {
    Arc::new(RwLock::new(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::DISABLED;

    fn row(
        region: &str,
        service: &str,
        team: &str,
        acro: &str,
        count: f64,
        hours: f64,
    ) -> IncidentRecord {
        IncidentRecord {
            region: region.to_string(),
            shift: "Day".to_string(),
            service: service.to_string(),
            team: team.to_string(),
            team_acro: acro.to_string(),
            count,
            hours,
            ..Default::default()
        }
    }

    fn session() -> Session {
        let incidents = vec![
            row("UK", "CTR", "Alpha Team", "AT", 5.0, 2.0),
            row("UK", "CTR", "Beta Team", "BT", 3.0, 6.0),
            row("UK", "CTR", "Gamma Team", "GT", 1.0, 1.0),
            row("Mars", "Other", "Delta Team", "DT", 4.0, 9.0),
        ];
        let relations = vec![RelationEdge::new("CTR", "Ghost")];
        Session::new(DashboardConfig::default(), Dataset::new(incidents, relations))
    }

    #[test]
    fn test_default_selection_and_team_derivation() {
        let session = session();
        assert_eq!(session.selected_services(), vec!["CTR"]);
        let teams = session.filters().selected_values(Dimension::Team);
        assert_eq!(teams, vec!["Alpha Team", "Beta Team"]);
        let filtered = session.filtered();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_service_change_rederives_teams() {
        let mut session = session();
        assert!(session.toggle(Dimension::Service, "Other"));
        let teams = session.filters().selected_values(Dimension::Team);
        assert!(teams.contains(&"Delta Team"));
        assert!(!session.toggle(Dimension::Service, "Nope"));
    }

    #[test]
    fn test_empty_selection_means_no_filter() {
        let mut session = session();
        session.select_all(Dimension::Region, false);
        session.select_all(Dimension::Service, false);
        session.select_all(Dimension::Team, false);
        assert_eq!(session.filtered().len(), 4);
    }

    #[test]
    fn test_no_data_outcome() {
        let mut session = session();
        let unknown = session.select_only(Dimension::Region, &["Mars"]);
        assert!(unknown.is_empty());
        assert!(matches!(session.flow(), FlowOutcome::NoData));
    }

    #[test]
    fn test_threshold_recolors_without_reaggregating() {
        let mut session = session();
        session.set_color_policy(ColorPolicy::Percentile);
        let outcome = session.flow();
        let graph = outcome.graph().unwrap();
        session.set_threshold(0.0);
        let low = session.flow_scales(graph);
        session.set_threshold(10.0);
        let high = session.flow_scales(graph);
        let node = &graph.nodes[0];
        assert_ne!(low.nodes.color(node.hours, 0.5), DISABLED);
        assert_eq!(high.nodes.color(node.hours, 0.5), DISABLED);
    }

    #[test]
    fn test_graph_ignores_filters() {
        let session = session();
        let graph = session.service_graph().unwrap();
        assert_eq!(graph.node("CTR").unwrap().stats.count, 9.0);
        assert_eq!(graph.node("Ghost").unwrap().stats.count, 0.0);
    }

    #[test]
    fn test_team_names_from_filtered_rows() {
        let session = session();
        let names = session.team_names();
        assert_eq!(names.get("AT").map(String::as_str), Some("Alpha Team"));
        assert!(!names.contains_key("DT"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut session = session();
        session.select_all(Dimension::Service, true);
        session.reset_filters();
        assert_eq!(session.selected_services(), vec!["CTR"]);
    }

    #[test]
    fn test_shared_session_single_writer() {
        let handle = shared(session());
        {
            let mut writer = handle.write();
            writer.set_threshold(7.0);
        }
        let a = handle.read();
        let b = handle.read();
        assert_eq!(a.threshold(), b.threshold());
    }

    #[test]
    fn test_prompt_data_borrows_selection() {
        let session = session();
        let services = session.with_prompt_data(|data| data.selected_services.len());
        assert_eq!(services, 1);
    }
}
