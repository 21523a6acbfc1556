use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A categorical column that can act as a grouping stage or a filter.
///
/// The string form is the CSV header name, so config files and CLI flags
/// use the same spelling as the uploaded tables (`"Team Acro"`, `"Time of Day"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dimension {
    Region,
    Shift,
    Team,
    Service,
    TeamAcro,
    Area,
    TimeOfDay,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Region,
        Dimension::Shift,
        Dimension::Team,
        Dimension::Service,
        Dimension::TeamAcro,
        Dimension::Area,
        Dimension::TimeOfDay,
    ];

    /// CSV header for this dimension.
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Region => "Region",
            Dimension::Shift => "Shift",
            Dimension::Team => "Team",
            Dimension::Service => "Service",
            Dimension::TeamAcro => "Team Acro",
            Dimension::Area => "Area",
            Dimension::TimeOfDay => "Time of Day",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| {
                d.column().eq_ignore_ascii_case(wanted)
                    || d.column().replace(' ', "").eq_ignore_ascii_case(wanted)
                    || format!("{d:?}").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("unknown dimension '{wanted}'"))
    }
}

impl TryFrom<String> for Dimension {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimension> for String {
    fn from(value: Dimension) -> Self {
        value.column().to_string()
    }
}

/// One incident row, or a pre-aggregated bucket of `count` incidents.
///
/// Every optional column has already been defaulted by the loader: text
/// fields are `""` when absent, `count` is 1 and `hours` is 0. Rows are
/// never mutated after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub region: String,
    pub shift: String,
    pub team: String,
    pub service: String,
    pub team_acro: String,
    pub area: String,
    pub time_of_day: String,
    pub count: f64,
    pub hours: f64,
    /// Raw composite `Incident Data` field, kept for insight prompts.
    pub incident_data: String,
    pub incident: String,
    pub description: String,
    pub impact: String,
    pub resolution: String,
}

impl Default for IncidentRecord {
    fn default() -> Self {
        Self {
            region: String::new(),
            shift: String::new(),
            team: String::new(),
            service: String::new(),
            team_acro: String::new(),
            area: String::new(),
            time_of_day: String::new(),
            count: 1.0,
            hours: 0.0,
            incident_data: String::new(),
            incident: String::new(),
            description: String::new(),
            impact: String::new(),
            resolution: String::new(),
        }
    }
}

impl IncidentRecord {
    /// Value of a categorical column.
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Region => &self.region,
            Dimension::Shift => &self.shift,
            Dimension::Team => &self.team,
            Dimension::Service => &self.service,
            Dimension::TeamAcro => &self.team_acro,
            Dimension::Area => &self.area,
            Dimension::TimeOfDay => &self.time_of_day,
        }
    }

    /// `hours * count`, the row's contribution to a weighted mean.
    pub fn weighted_hours(&self) -> f64 {
        self.hours * self.count
    }
}

/// A directed dependency between two services.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source: String,
    pub target: String,
}

impl RelationEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The endpoint opposite `service`, if this edge touches it.
    pub fn other_end(&self, service: &str) -> Option<&str> {
        if self.source == service {
            Some(&self.target)
        } else if self.target == service {
            Some(&self.source)
        } else {
            None
        }
    }
}
