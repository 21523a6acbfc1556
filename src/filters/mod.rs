//! Per-dimension filter selection.
//!
//! A row passes the filter iff, for every dimension with at least one
//! selected option, the row's value is among the selected ones. Dimensions
//! with nothing selected impose no constraint.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::engine::select_top_teams;
use crate::types::{Dimension, IncidentRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub selected: bool,
}

/// How a dimension's options are selected after (re)initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultSelection {
    All,
    None,
    AllowList(Vec<String>),
}

impl DefaultSelection {
    fn selects(&self, value: &str) -> bool {
        match self {
            DefaultSelection::All => true,
            DefaultSelection::None => false,
            DefaultSelection::AllowList(names) => names.iter().any(|n| n == value),
        }
    }
}

/// Static inputs of the filter state, usually derived from the dashboard config.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    pub dimensions: Vec<Dimension>,
    pub preselected_services: Vec<String>,
    pub preselected_regions: Vec<String>,
    pub top_teams_per_service: usize,
}

impl FilterPolicy {
    pub fn default_selection(&self, dimension: Dimension) -> DefaultSelection {
        match dimension {
            Dimension::Service => DefaultSelection::AllowList(self.preselected_services.clone()),
            Dimension::Region => DefaultSelection::AllowList(self.preselected_regions.clone()),
            Dimension::Team => DefaultSelection::None,
            _ => DefaultSelection::All,
        }
    }

    /// Predicate behind the "Top 10" shortcut.
    pub fn is_preselected(&self, dimension: Dimension, value: &str) -> bool {
        self.default_selection(dimension).selects(value)
    }
}

#[derive(Debug, Clone)]
pub struct FilterState {
    policy: FilterPolicy,
    mapping: Vec<(Dimension, Vec<FilterOption>)>,
}

impl FilterState {
    /// Build the state for `rows` with the default-selection policy applied.
    pub fn new(policy: FilterPolicy, rows: &[IncidentRecord]) -> Self {
        let mut state = Self {
            mapping: policy.dimensions.iter().map(|&d| (d, Vec::new())).collect(),
            policy,
        };
        state.reset(rows);
        state
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.mapping.iter().map(|(d, _)| *d)
    }

    /// Recompute the distinct values of one dimension and apply its default selection.
    pub fn initialize(&mut self, dimension: Dimension, rows: &[IncidentRecord]) {
        let defaults = self.policy.default_selection(dimension);
        let values: BTreeSet<&str> = rows.iter().map(|r| r.value(dimension)).collect();
        let options = values
            .into_iter()
            .map(|v| FilterOption {
                value: v.to_string(),
                selected: defaults.selects(v),
            })
            .collect::<Vec<_>>();
        tracing::debug!(dimension = %dimension, options = options.len(), "初始化筛选项");
        if let Some(slot) = self.options_mut(dimension) {
            *slot = options;
        }
    }

    /// Restore every dimension to its default selection, then derive teams.
    pub fn reset(&mut self, rows: &[IncidentRecord]) {
        let dimensions: Vec<Dimension> = self.dimensions().collect();
        for dimension in dimensions {
            self.initialize(dimension, rows);
        }
        self.derive_top_teams(rows);
    }

    /// Flip one option. Returns `false` when the value is unknown.
    pub fn toggle(&mut self, dimension: Dimension, value: &str) -> bool {
        match self.find_mut(dimension, value) {
            Some(option) => {
                option.selected = !option.selected;
                true
            }
            None => false,
        }
    }

    /// Set one option explicitly. Returns `false` when the value is unknown.
    pub fn set(&mut self, dimension: Dimension, value: &str, selected: bool) -> bool {
        match self.find_mut(dimension, value) {
            Some(option) => {
                option.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self, dimension: Dimension, selected: bool) {
        if let Some(options) = self.options_mut(dimension) {
            options.iter_mut().for_each(|o| o.selected = selected);
        }
    }

    /// Select exactly the options accepted by `predicate`.
    pub fn select_where<F>(&mut self, dimension: Dimension, predicate: F)
    where
        F: Fn(&str) -> bool,
    {
        if let Some(options) = self.options_mut(dimension) {
            options.iter_mut().for_each(|o| o.selected = predicate(&o.value));
        }
    }

    /// The "Top 10" shortcut: select the pre-approved values, or none when `checked` is false.
    pub fn select_top_k(&mut self, dimension: Dimension, checked: bool) {
        let policy = self.policy.clone();
        self.select_where(dimension, |v| checked && policy.is_preselected(dimension, v));
    }

    /// Select exactly `values`. Unknown values are returned.
    pub fn select_only<'v>(&mut self, dimension: Dimension, values: &[&'v str]) -> Vec<&'v str> {
        self.select_all(dimension, false);
        values
            .iter()
            .copied()
            .filter(|v| !self.set(dimension, v, true))
            .collect()
    }

    /// Replace the Team selection by the top teams of the selected services.
    pub fn derive_top_teams(&mut self, rows: &[IncidentRecord]) {
        if self.options(Dimension::Team).is_none() {
            return;
        }
        let top = {
            let services = self.selected(Dimension::Service);
            select_top_teams(rows, &services, self.policy.top_teams_per_service)
        };
        tracing::debug!(teams = top.len(), "根据所选服务推导重点团队");
        self.select_where(Dimension::Team, |v| top.contains(v));
    }

    pub fn options(&self, dimension: Dimension) -> Option<&[FilterOption]> {
        self.mapping
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, o)| o.as_slice())
    }

    /// Options in display order: selected first, then alphabetical.
    pub fn display_options(&self, dimension: Dimension) -> Vec<&FilterOption> {
        let mut options: Vec<&FilterOption> =
            self.options(dimension).map(|o| o.iter().collect()).unwrap_or_default();
        options.sort_by(|a, b| b.selected.cmp(&a.selected).then_with(|| a.value.cmp(&b.value)));
        options
    }

    /// Case-insensitive substring search over one dimension's options.
    pub fn search(&self, dimension: Dimension, text: &str) -> Vec<&FilterOption> {
        let needle = text.to_lowercase();
        self.display_options(dimension)
            .into_iter()
            .filter(|o| o.value.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected(&self, dimension: Dimension) -> HashSet<&str> {
        self.selected_values(dimension).into_iter().collect()
    }

    /// Selected values in alphabetical order.
    pub fn selected_values(&self, dimension: Dimension) -> Vec<&str> {
        self.options(dimension)
            .map(|o| {
                o.iter()
                    .filter(|o| o.selected)
                    .map(|o| o.value.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn matches(&self, row: &IncidentRecord) -> bool {
        self.mapping.iter().all(|(dimension, options)| {
            let mut any_selected = false;
            for option in options.iter().filter(|o| o.selected) {
                any_selected = true;
                if option.value == row.value(*dimension) {
                    return true;
                }
            }
            !any_selected
        })
    }

    pub fn apply<'a>(&self, rows: &'a [IncidentRecord]) -> Vec<&'a IncidentRecord> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }

    fn options_mut(&mut self, dimension: Dimension) -> Option<&mut Vec<FilterOption>> {
        self.mapping
            .iter_mut()
            .find(|(d, _)| *d == dimension)
            .map(|(_, o)| o)
    }

    fn find_mut(&mut self, dimension: Dimension, value: &str) -> Option<&mut FilterOption> {
        self.options_mut(dimension)?
            .iter_mut()
            .find(|o| o.value == value)
    }
}
