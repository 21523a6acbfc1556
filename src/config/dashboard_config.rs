use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::color::{clamp_threshold, ColorPolicy, DEFAULT_THRESHOLD};
use crate::errors::ConfigError;
use crate::filters::FilterPolicy;
use crate::types::Dimension;

pub const ENV_THRESHOLD: &str = "INCIDENT_FLOW_THRESHOLD";
pub const ENV_COLOR_POLICY: &str = "INCIDENT_FLOW_COLOR_POLICY";

/// Axes along which the dashboard variants differ.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DashboardConfig {
    /// Ordered stages of the flow diagram.
    pub flow_dimensions: Vec<Dimension>,
    /// Dimensions exposed as filters.
    pub filter_dimensions: Vec<Dimension>,
    pub preselected_services: Vec<String>,
    pub preselected_regions: Vec<String>,
    pub color_policy: ColorPolicy,
    /// Duration threshold in hours, `0..=10`.
    pub threshold: f64,
    pub top_teams_per_service: usize,
    pub show_links: bool,
    /// Pause between consecutive insight requests.
    pub insight_delay_ms: u64,
}

/// Partial Dashboard Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialDashboardConfig {
    pub flow_dimensions: Option<Vec<Dimension>>,
    pub filter_dimensions: Option<Vec<Dimension>>,
    pub preselected_services: Option<Vec<String>>,
    pub preselected_regions: Option<Vec<String>>,
    pub color_policy: Option<ColorPolicy>,
    pub threshold: Option<f64>,
    pub top_teams_per_service: Option<usize>,
    pub show_links: Option<bool>,
    pub insight_delay_ms: Option<u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            flow_dimensions: default_flow_dimensions(),
            filter_dimensions: default_filter_dimensions(),
            preselected_services: default_preselected_services(),
            preselected_regions: default_preselected_regions(),
            color_policy: ColorPolicy::default(),
            threshold: DEFAULT_THRESHOLD,
            top_teams_per_service: default_top_teams_per_service(),
            show_links: false,
            insight_delay_ms: default_insight_delay_ms(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env_or_file(
        partial: Option<PartialDashboardConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let flow_dimensions = partial.flow_dimensions.unwrap_or_else(default_flow_dimensions);
        if flow_dimensions.is_empty() {
            return Err(ConfigError::EmptyDimensions("flow_dimensions".to_string()));
        }
        let filter_dimensions = partial
            .filter_dimensions
            .unwrap_or_else(default_filter_dimensions);
        if filter_dimensions.is_empty() {
            return Err(ConfigError::EmptyDimensions("filter_dimensions".to_string()));
        }

        let color_policy = match env_map.get(ENV_COLOR_POLICY) {
            Some(raw) => raw.parse().map_err(ConfigError::UnsupportedPolicy)?,
            None => partial.color_policy.unwrap_or_default(),
        };

        let threshold = env_map
            .get(ENV_THRESHOLD)
            .and_then(|s| s.parse::<f64>().ok())
            .or(partial.threshold)
            .unwrap_or(DEFAULT_THRESHOLD);

        Ok(Self {
            flow_dimensions,
            filter_dimensions,
            preselected_services: partial
                .preselected_services
                .unwrap_or_else(default_preselected_services),
            preselected_regions: partial
                .preselected_regions
                .unwrap_or_else(default_preselected_regions),
            color_policy,
            threshold: clamp_threshold(threshold),
            top_teams_per_service: partial
                .top_teams_per_service
                .unwrap_or_else(default_top_teams_per_service),
            show_links: partial.show_links.unwrap_or(false),
            insight_delay_ms: partial.insight_delay_ms.unwrap_or_else(default_insight_delay_ms),
        })
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy {
            dimensions: self.filter_dimensions.clone(),
            preselected_services: self.preselected_services.clone(),
            preselected_regions: self.preselected_regions.clone(),
            top_teams_per_service: self.top_teams_per_service,
        }
    }
}

// Default functions
fn default_flow_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::Shift,
        Dimension::Region,
        Dimension::TeamAcro,
        Dimension::Service,
    ]
}

fn default_filter_dimensions() -> Vec<Dimension> {
    vec![
        Dimension::Region,
        Dimension::Shift,
        Dimension::Team,
        Dimension::Service,
    ]
}

fn default_preselected_services() -> Vec<String> {
    [
        "CTR", "LOGAN", "VaR", "GRT", "LIQ", "RWH", "Argos", "PXV", "TLM", "K2", "TARDIS",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_preselected_regions() -> Vec<String> {
    ["Canada", "Ireland", "USA", "UK", "Global", "Singapore", "LATAM"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_top_teams_per_service() -> usize {
    2
}

fn default_insight_delay_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_env_or_file(None, &HashMap::new()).unwrap();
        assert_eq!(config.flow_dimensions.len(), 4);
        assert_eq!(config.flow_dimensions[2], Dimension::TeamAcro);
        assert_eq!(config.preselected_services.len(), 11);
        assert_eq!(config.preselected_regions.len(), 7);
        assert_eq!(config.threshold, 3.0);
        assert_eq!(config.color_policy, ColorPolicy::Fixed);
    }

    #[test]
    fn test_dimensions_parse_from_toml() {
        let partial: PartialDashboardConfig = toml::from_str(
            r#"
            flow_dimensions = ["Region", "Time of Day", "Service"]
            color_policy = "percentile"
            threshold = 42.0
            "#,
        )
        .unwrap();
        let config = DashboardConfig::from_env_or_file(Some(partial), &HashMap::new()).unwrap();
        assert_eq!(
            config.flow_dimensions,
            vec![Dimension::Region, Dimension::TimeOfDay, Dimension::Service]
        );
        assert_eq!(config.color_policy, ColorPolicy::Percentile);
        assert_eq!(config.threshold, 10.0);
    }

    #[test]
    fn test_env_overrides() {
        let mut env_map = HashMap::new();
        env_map.insert(ENV_THRESHOLD.to_string(), "5.5".to_string());
        env_map.insert(ENV_COLOR_POLICY.to_string(), "Percentile".to_string());
        let config = DashboardConfig::from_env_or_file(None, &env_map).unwrap();
        assert_eq!(config.threshold, 5.5);
        assert_eq!(config.color_policy, ColorPolicy::Percentile);

        env_map.insert(ENV_COLOR_POLICY.to_string(), "rainbow".to_string());
        let err = DashboardConfig::from_env_or_file(None, &env_map).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedPolicy(p) if p == "rainbow"));
    }

    #[test]
    fn test_empty_dimensions_rejected() {
        let partial = PartialDashboardConfig {
            flow_dimensions: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(
            DashboardConfig::from_env_or_file(Some(partial), &HashMap::new()),
            Err(ConfigError::EmptyDimensions(_))
        ));
    }
}
