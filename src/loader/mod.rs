//! Typed record loading for the two uploaded tables.
//!
//! Column lookup is by header name and is validated once here; downstream
//! code only ever sees fully-defaulted [`IncidentRecord`]s and
//! [`RelationEdge`]s.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::errors::LoadError;
use crate::types::{Dimension, IncidentRecord, RelationEdge};

pub const INCIDENTS_DATASET: &str = "incidents";
pub const RELATIONS_DATASET: &str = "relations";

const INCIDENT_DATA_COLUMN: &str = "Incident Data";
const INCIDENT_DATA_DELIMITER: char = '|';

/// Both uploaded tables. Replaced wholesale on every upload.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub incidents: Vec<IncidentRecord>,
    pub relations: Vec<RelationEdge>,
}

impl Dataset {
    pub fn new(incidents: Vec<IncidentRecord>, relations: Vec<RelationEdge>) -> Self {
        Self {
            incidents,
            relations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

/// Header-name to index lookup for one table.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_string(), i))
            .collect();
        Self { index }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn require(&self, dataset: &str, name: &str) -> Result<(), LoadError> {
        if self.has(name) {
            Ok(())
        } else {
            Err(LoadError::MissingColumn {
                dataset: dataset.to_string(),
                column: name.to_string(),
            })
        }
    }

    fn text(&self, row: &StringRecord, name: &str) -> String {
        self.index
            .get(name)
            .and_then(|&i| row.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn number(&self, row: &StringRecord, name: &str) -> Option<f64> {
        let raw = self.text(row, name);
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                tracing::warn!(column = name, value = %raw, "非数值字段，使用默认值");
                None
            }
        }
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|e| LoadError::Read(path.display().to_string(), e))
}

/// Load the incidents table from disk.
pub fn load_incidents(path: &Path) -> Result<Vec<IncidentRecord>, LoadError> {
    let file = open(path)?;
    let records = parse_incidents(file, delimiter_for(path))?;
    tracing::info!(rows = records.len(), path = %path.display(), "已加载事件数据");
    Ok(records)
}

/// Load the relations table from disk.
pub fn load_relations(path: &Path) -> Result<Vec<RelationEdge>, LoadError> {
    let file = open(path)?;
    let edges = parse_relations(file, delimiter_for(path))?;
    tracing::info!(edges = edges.len(), path = %path.display(), "已加载服务关系数据");
    Ok(edges)
}

/// Parse incident rows.
///
/// `Service` is mandatory. Every other categorical column defaults to `""`,
/// `Count` to 1 and `Hours` to 0. A non-empty `Incident Data` field is split
/// on `|` into incident / description / impact / resolution and takes
/// precedence over same-named standalone columns.
pub fn parse_incidents<R: Read>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<IncidentRecord>, LoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| LoadError::Csv(INCIDENTS_DATASET.to_string(), e))?
        .clone();
    let columns = Columns::new(&headers);
    columns.require(INCIDENTS_DATASET, Dimension::Service.column())?;

    for dimension in Dimension::ALL {
        if !columns.has(dimension.column()) {
            tracing::debug!(
                column = dimension.column(),
                "事件数据缺少可选列，使用空字符串"
            );
        }
    }

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| LoadError::Csv(INCIDENTS_DATASET.to_string(), e))?;
        let line = i + 2;

        let count = columns.number(&row, "Count").unwrap_or(1.0);
        let hours = columns.number(&row, "Hours").unwrap_or(0.0);
        for (column, value) in [("Count", count), ("Hours", hours)] {
            if value < 0.0 {
                return Err(LoadError::NegativeValue {
                    dataset: INCIDENTS_DATASET.to_string(),
                    row: line,
                    column: column.to_string(),
                    value,
                });
            }
        }

        let mut record = IncidentRecord {
            region: columns.text(&row, Dimension::Region.column()),
            shift: columns.text(&row, Dimension::Shift.column()),
            team: columns.text(&row, Dimension::Team.column()),
            service: columns.text(&row, Dimension::Service.column()),
            team_acro: columns.text(&row, Dimension::TeamAcro.column()),
            area: columns.text(&row, Dimension::Area.column()),
            time_of_day: columns.text(&row, Dimension::TimeOfDay.column()),
            count,
            hours,
            incident_data: columns.text(&row, INCIDENT_DATA_COLUMN),
            incident: columns.text(&row, "Incident"),
            description: columns.text(&row, "DescriptionCleaned"),
            impact: columns.text(&row, "ImpactCleaned"),
            resolution: columns.text(&row, "ResolutionDetails"),
        };
        if !record.incident_data.is_empty() {
            split_incident_data(&mut record);
        }
        records.push(record);
    }

    Ok(records)
}

fn split_incident_data(record: &mut IncidentRecord) {
    let mut parts = record
        .incident_data
        .split(INCIDENT_DATA_DELIMITER)
        .map(|p| p.trim().to_string());
    record.incident = parts.next().unwrap_or_default();
    record.description = parts.next().unwrap_or_default();
    record.impact = parts.next().unwrap_or_default();
    record.resolution = parts.next().unwrap_or_default();
}

/// Parse `Source,Target` rows. Rows with an empty endpoint are skipped.
pub fn parse_relations<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RelationEdge>, LoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| LoadError::Csv(RELATIONS_DATASET.to_string(), e))?
        .clone();
    let columns = Columns::new(&headers);
    columns.require(RELATIONS_DATASET, "Source")?;
    columns.require(RELATIONS_DATASET, "Target")?;

    let mut edges = Vec::new();
    for row in csv_reader.records() {
        let row = row.map_err(|e| LoadError::Csv(RELATIONS_DATASET.to_string(), e))?;
        let source = columns.text(&row, "Source");
        let target = columns.text(&row, "Target");
        if source.is_empty() || target.is_empty() {
            tracing::debug!("跳过端点为空的关系行");
            continue;
        }
        edges.push(RelationEdge { source, target });
    }
    Ok(edges)
}
